//! Prompt construction and answer clean-up.

use crate::config::Lang;

/// Marker that precedes the answer in completion-style prompts
pub const ANSWER_MARKER: &str = "Translation:";

/// User message for instruction-tuned chat models.
pub fn chat_user_prompt(text: &str, target: &Lang) -> String {
    format!(
        "Translate the following Arabic text to {target}. Provide only the translation, without any additional text or explanations.\n\nArabic text: \"{text}\""
    )
}

/// Raw prompt for plain causal models; the model continues after the marker.
pub fn completion_prompt(text: &str, target: &Lang) -> String {
    format!("Translate the following Islamic Arabic text to {target}.\nText: {text}\n\n{ANSWER_MARKER}")
}

/// Keep only what follows the last answer marker (models often echo the
/// prompt), trimmed.
pub fn extract_completion_answer(output: &str) -> String {
    output
        .rsplit(ANSWER_MARKER)
        .next()
        .unwrap_or(output)
        .trim()
        .to_string()
}

/// Trim and drop quotes the model wrapped around its answer.
pub fn clean_answer(output: &str) -> String {
    let trimmed = output.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}
