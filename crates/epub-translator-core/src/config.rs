use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Target language as given to the model.
///
/// The model is told the name verbatim, so any language name works
/// ("English", "Bahasa Indonesia", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe form used in cache file names.
    pub fn slug(&self) -> String {
        let slug: String = self
            .0
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        if slug.is_empty() { "unknown".to_string() } else { slug }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<TargetLanguage> for Lang {
    fn from(lang: TargetLanguage) -> Self {
        Self::new(lang.name())
    }
}

/// The closed set of target languages accepted by the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetLanguage {
    English,
    #[default]
    Indonesian,
    Malay,
    Japanese,
    Korean,
}

impl TargetLanguage {
    pub const fn all() -> [Self; 5] {
        [
            Self::English,
            Self::Indonesian,
            Self::Malay,
            Self::Japanese,
            Self::Korean,
        ]
    }

    /// English name, as used in prompts and API payloads
    pub const fn name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Indonesian => "Indonesian",
            Self::Malay => "Malay",
            Self::Japanese => "Japanese",
            Self::Korean => "Korean",
        }
    }

    /// ISO 639-1 code
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Indonesian => "id",
            Self::Malay => "ms",
            Self::Japanese => "ja",
            Self::Korean => "ko",
        }
    }
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetLanguage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::all()
            .into_iter()
            .find(|lang| {
                lang.name().eq_ignore_ascii_case(wanted) || lang.code().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| Error::TranslationUnsupportedLanguage(wanted.to_string()))
    }
}

/// How prompts are sent to the model server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// Instruction-tuned chat models via `/chat/completions`
    #[default]
    Chat,
    /// Plain causal models via `/completions`, answer follows `Translation:`
    Completion,
}

impl FromStr for PromptMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "completion" | "completions" => Ok(Self::Completion),
            other => Err(Error::ConfigInvalid {
                field: "translator.mode".to_string(),
                reason: format!("unknown prompt mode '{other}'"),
            }),
        }
    }
}

/// Translator backend configuration for OpenAI-compatible APIs.
///
/// Supports llama.cpp, Ollama, vLLM, TGI and any other server that exposes the
/// OpenAI completion endpoints for a pretrained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub mode: PromptMode,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

pub const DEFAULT_MODEL: &str = "Qwen/Qwen2-1.5B-Instruct";
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/v1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert translator.";

impl TranslatorConfig {
    /// Create a new translator config
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "translator.api_base".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                field: "translator.model".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.retry_count == 0 {
            return Err(Error::ConfigInvalid {
                field: "translator.retry_count".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            mode: PromptMode::Chat,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 1024,
            // Greedy decoding
            temperature: 0.0,
            timeout_secs: 300,
            retry_count: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding `*.translation_cache.json` files
    /// (defaults to $XDG_CACHE_HOME/epub-translator)
    pub dir: Option<PathBuf>,

    /// Disable to always call the model
    pub enabled: bool,

    /// Enable the in-memory layer in front of the JSON files
    pub memory_enabled: bool,

    /// Maximum memory cache entries
    pub memory_max_entries: u64,

    /// Memory cache TTL in seconds (0 = no expiry)
    pub memory_ttl_seconds: u64,

    /// How long scanned chunk lists are kept (0 = no expiry)
    pub scan_ttl_seconds: u64,

    /// Maximum number of scanned books kept in memory
    pub scan_max_books: u64,
}

impl CacheConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(crate::util::translation_cache_path)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            enabled: true,
            memory_enabled: true,
            memory_max_entries: 10_000,
            memory_ttl_seconds: 0,
            scan_ttl_seconds: 3600,
            scan_max_books: 64,
        }
    }
}

/// How an EPUB is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Unique sentences from every text node, sorted
    #[default]
    Sentences,
    /// Arabic paragraph runs packed up to `max_chunk_chars`, in reading order
    Paragraphs,
}

impl FromStr for ChunkStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sentences" | "sentence" => Ok(Self::Sentences),
            "paragraphs" | "paragraph" => Ok(Self::Paragraphs),
            other => Err(Error::ConfigInvalid {
                field: "extraction.strategy".to_string(),
                reason: format!("unknown chunk strategy '{other}'"),
            }),
        }
    }
}

/// Text extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub strategy: ChunkStrategy,
    /// Sentences with fewer words are dropped
    pub min_words: usize,
    /// Upper bound for packed paragraph chunks, in characters
    pub max_chunk_chars: usize,
    /// Shortest Arabic run kept by the paragraph strategy, in characters
    pub min_run_chars: usize,
    pub min_sentence_chars: Option<usize>,
    pub max_sentence_chars: Option<usize>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::Sentences,
            min_words: 3,
            max_chunk_chars: 256,
            min_run_chars: 40,
            min_sentence_chars: None,
            max_sentence_chars: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default target language
    pub target_language: TargetLanguage,

    /// Translator backend configuration
    pub translator: TranslatorConfig,

    /// Cache configuration
    pub cache: CacheConfig,

    /// Chunk extraction configuration
    pub extraction: ExtractionConfig,
}

/// Prefix for environment overrides, e.g. `EPUB_TRANSLATOR__TRANSLATOR__MODEL`
pub const ENV_PREFIX: &str = "EPUB_TRANSLATOR";

impl AppConfig {
    /// Load configuration from a single TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigLoad(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))
    }

    /// Load from default locations, lowest priority first:
    /// ~/.config/epub-translator/config.toml, ./config.toml, then
    /// `EPUB_TRANSLATOR__*` environment variables.
    pub fn load() -> Result<Self> {
        let mut files = Vec::new();
        if let Some(config_dir) = crate::util::config_dir() {
            files.push(config_dir.join("epub-translator").join("config.toml"));
        }
        files.push(PathBuf::from("config.toml"));
        Self::load_layered(&files)
    }

    /// Layer the given TOML files (missing ones are skipped) and the environment.
    pub fn load_layered(files: &[PathBuf]) -> Result<Self> {
        let mut builder = config::Config::builder();
        for file in files {
            if file.exists() {
                tracing::debug!("Loading config from {}", file.display());
            }
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::ConfigLoad(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_language_parsing() {
        assert_eq!("English".parse::<TargetLanguage>().unwrap(), TargetLanguage::English);
        assert_eq!("korean".parse::<TargetLanguage>().unwrap(), TargetLanguage::Korean);
        assert_eq!("id".parse::<TargetLanguage>().unwrap(), TargetLanguage::Indonesian);
        assert!("Klingon".parse::<TargetLanguage>().is_err());
    }

    #[test]
    fn test_target_language_default_is_indonesian() {
        assert_eq!(TargetLanguage::default(), TargetLanguage::Indonesian);
    }

    #[test]
    fn test_target_language_serde_uses_name() {
        let json = serde_json::to_string(&TargetLanguage::Malay).unwrap();
        assert_eq!(json, "\"Malay\"");
    }

    #[test]
    fn test_lang_slug() {
        assert_eq!(Lang::new("English").slug(), "english");
        assert_eq!(Lang::new("Bahasa Indonesia").slug(), "bahasa-indonesia");
        assert_eq!(Lang::new("  ").slug(), "unknown");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.translator.model, DEFAULT_MODEL);
        assert_eq!(config.translator.mode, PromptMode::Chat);
        assert_eq!(config.extraction.min_words, 3);
        assert_eq!(config.extraction.max_chunk_chars, 256);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_from_file_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "target_language = \"English\"\n\n[translator]\nmodel = \"bigscience/bloomz-7b1-mt\"\nmode = \"completion\"\n\n[extraction]\nstrategy = \"paragraphs\"\n",
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.target_language, TargetLanguage::English);
        assert_eq!(config.translator.model, "bigscience/bloomz-7b1-mt");
        assert_eq!(config.translator.mode, PromptMode::Completion);
        assert_eq!(config.translator.api_base, DEFAULT_API_BASE);
        assert_eq!(config.extraction.strategy, ChunkStrategy::Paragraphs);
    }

    #[test]
    fn test_load_layered_later_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        std::fs::write(&first, "[translator]\nmodel = \"a\"\nretry_count = 7\n").unwrap();
        std::fs::write(&second, "[translator]\nmodel = \"b\"\n").unwrap();

        let config =
            AppConfig::load_layered(&[first, second, dir.path().join("missing.toml")]).unwrap();
        assert_eq!(config.translator.model, "b");
        assert_eq!(config.translator.retry_count, 7);
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let config = TranslatorConfig::new("http://localhost:8080/v1", None, "");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_and_mode_parse() {
        assert_eq!("paragraphs".parse::<ChunkStrategy>().unwrap(), ChunkStrategy::Paragraphs);
        assert_eq!("completion".parse::<PromptMode>().unwrap(), PromptMode::Completion);
        assert!("other".parse::<PromptMode>().is_err());
    }
}
