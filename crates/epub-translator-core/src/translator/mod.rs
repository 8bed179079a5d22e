mod openai;
pub mod prompt;
mod traits;

pub use openai::OpenAiTranslator;
pub use traits::{Translator, TranslatorInfo};

use crate::config::TranslatorConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a translator from configuration
pub fn create_translator(config: &TranslatorConfig) -> Result<Arc<dyn Translator>> {
    let translator = OpenAiTranslator::new(config.clone())?;
    Ok(Arc::new(translator))
}
