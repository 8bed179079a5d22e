use thiserror::Error;

/// Unified error type for epub-translator-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - EPUB operations (opening the container, reading the package, documents)
/// - Chunk selection (out-of-range chunk numbers)
/// - Translation operations (API requests, responses, rate limiting)
/// - Cache operations (reading, writing, clearing)
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // EPUB Errors
    // ==========================================================================
    /// Failed to open the EPUB zip container
    #[error("failed to open EPUB: {0}")]
    EpubOpen(String),

    /// The container or package document is missing or malformed
    #[error("invalid EPUB structure: {0}")]
    EpubStructure(String),

    /// Failed to read an entry from the EPUB archive
    #[error("failed to read EPUB entry '{name}': {reason}")]
    EpubEntry { name: String, reason: String },

    // ==========================================================================
    // Chunk Errors
    // ==========================================================================
    /// Requested chunk number is outside 1..=total
    #[error("invalid chunk number {number}, expected a number between 1 and {total}")]
    ChunkOutOfRange { number: usize, total: usize },

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// Unsupported target language
    #[error("unsupported target language: {0}")]
    TranslationUnsupportedLanguage(String),

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Maximum retry attempts exceeded for translation
    #[error("translation failed after maximum retries")]
    TranslationMaxRetriesExceeded,

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// Failed to initialize the cache directory
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to write a cache file
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was caused by the input document rather than the
    /// environment (used by the web layer to pick 400 vs 500).
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EpubOpen(_) | Self::EpubStructure(_) | Self::EpubEntry { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
