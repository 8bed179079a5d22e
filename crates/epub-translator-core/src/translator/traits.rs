use async_trait::async_trait;
use crate::config::Lang;
use crate::error::Result;

/// Information about a translator backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable backend name
    pub name: &'static str,
    /// Model served by the backend
    pub model: String,
}

/// Trait for translation backends
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get information about this translator
    fn info(&self) -> TranslatorInfo;

    /// Get the translator name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate Arabic source text into `target`
    async fn translate(&self, text: &str, target: &Lang) -> Result<String>;

    /// Check if the translator is available (e.g., API key configured)
    fn is_available(&self) -> bool {
        true
    }
}
