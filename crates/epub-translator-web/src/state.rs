use epub_translator_core::{BookTranslator, ScanCache};

/// Global application state
pub struct AppState {
    /// Translator with its cache, shared by every request
    pub translator: BookTranslator,
    /// Books scanned through `/total-chunk`, keyed by file id
    pub scans: ScanCache,
}

impl AppState {
    pub fn new(translator: BookTranslator) -> Self {
        // Same cache the translator scans into
        let scans = translator.scans().clone();
        Self { translator, scans }
    }
}
