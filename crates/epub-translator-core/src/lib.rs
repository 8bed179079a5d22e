//! EPUB Translator Core Library
//!
//! This library provides the core functionality for translating Arabic EPUB books:
//! - EPUB unpacking and XHTML text extraction
//! - Chunk selection (unique sentences or packed paragraphs)
//! - Translation via an OpenAI-compatible inference server
//! - Caching (memory and per-book JSON files)
//! - Bilingual output (tables, JSONL corpora, text)

pub mod cache;
pub mod chunk;
pub mod config;
pub mod epub;
pub mod error;
pub mod output;
pub mod text;
pub mod translator;
pub mod util;

pub use cache::{CacheKey, ScanCache, TranslationCache, clear_translation_cache};
pub use chunk::ChunkSet;
pub use config::{
    AppConfig, CacheConfig, ChunkStrategy, ExtractionConfig, Lang, PromptMode, TargetLanguage,
    TranslatorConfig,
};
pub use epub::EpubBook;
pub use error::{Error, Result};
pub use output::Stats;
pub use translator::{OpenAiTranslator, Translator, TranslatorInfo, create_translator};

use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefix of the cache namespace for free text that does not come from a book
pub const PLAIN_TEXT_PREFIX: &str = "text-";

/// Cache namespace of a plain-text run: `text-` and the first 16 hex digits
/// of the input's SHA-256.
pub fn plain_text_id(text: &str) -> String {
    let digest = util::sha256_hex(text.as_bytes());
    format!("{PLAIN_TEXT_PREFIX}{}", &digest[..16])
}

/// High-level book translator that combines all components
pub struct BookTranslator {
    translator: Arc<dyn Translator>,
    cache: TranslationCache,
    scans: ScanCache,
    config: AppConfig,
}

/// Result of translating a single chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedChunk {
    /// Chunk number (1-indexed)
    pub number: usize,
    /// Arabic source text
    pub original: String,
    pub translation: String,
    /// Whether this was a cache hit
    pub from_cache: bool,
}

impl BookTranslator {
    /// Create a new book translator with the given configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        let translator = create_translator(&config.translator)?;
        Self::with_translator(translator, config)
    }

    /// Create with a custom translator
    pub fn with_translator(translator: Arc<dyn Translator>, config: AppConfig) -> Result<Self> {
        let cache = TranslationCache::new(&config.cache)?;
        let scans = ScanCache::new(&config.cache);

        Ok(Self {
            translator,
            cache,
            scans,
            config,
        })
    }

    /// Chunks of `book`, reusing an earlier scan of the same content
    pub async fn scan(&self, book: &EpubBook) -> ChunkSet {
        if let Some(chunks) = self.scans.get(book.content_id()).await {
            debug!("Scan cache hit for {}", util::short_id(book.content_id()));
            return chunks;
        }

        let chunks = chunk::scan(book, &self.config.extraction);
        self.scans.insert(chunks.clone()).await;
        chunks
    }

    /// Translate one chunk by its 1-based number
    pub async fn translate_chunk(
        &self,
        chunks: &ChunkSet,
        number: usize,
        target: &Lang,
    ) -> Result<TranslatedChunk> {
        let original = chunks.get(number)?;
        self.translate_chunk_impl(chunks.book_id(), number, original, target, false)
            .await
    }

    /// Translate one chunk, bypassing the cache lookup (the result is still stored)
    pub async fn translate_chunk_force(
        &self,
        chunks: &ChunkSet,
        number: usize,
        target: &Lang,
    ) -> Result<TranslatedChunk> {
        let original = chunks.get(number)?;
        self.translate_chunk_impl(chunks.book_id(), number, original, target, true)
            .await
    }

    /// Internal implementation of translate_chunk
    async fn translate_chunk_impl(
        &self,
        book_id: &str,
        number: usize,
        original: &str,
        target: &Lang,
        force: bool,
    ) -> Result<TranslatedChunk> {
        if !force
            && let Some(cached) = self.cache.get(book_id, target, original).await
        {
            debug!("Cache hit for chunk {}", number);
            return Ok(TranslatedChunk {
                number,
                original: original.to_string(),
                translation: cached,
                from_cache: true,
            });
        }

        info!(
            "Translating chunk {} to {} with {}{}",
            number,
            target,
            self.translator.name(),
            if force { " (forced)" } else { "" }
        );

        let translation = self.translator.translate(original, target).await?;

        // A failed write only costs a retranslation later
        if let Err(e) = self.cache.insert(book_id, target, original, &translation).await {
            warn!("Failed to cache chunk {}: {}", number, e);
        }

        Ok(TranslatedChunk {
            number,
            original: original.to_string(),
            translation,
            from_cache: false,
        })
    }

    /// Translate every chunk with at most `concurrency` requests in flight.
    ///
    /// Results come back in chunk order. The first failure aborts the run.
    pub async fn translate_all(
        &self,
        chunks: &ChunkSet,
        target: &Lang,
        concurrency: usize,
        progress_callback: Option<Box<dyn Fn(usize, usize) + Send>>,
    ) -> Result<Vec<TranslatedChunk>> {
        let total = chunks.len();
        let mut translated = Vec::with_capacity(total);

        let mut results = futures::stream::iter(chunks.iter())
            .map(|(number, original)| {
                self.translate_chunk_impl(chunks.book_id(), number, original, target, false)
            })
            .buffered(concurrency.max(1));

        while let Some(result) = results.next().await {
            translated.push(result?);

            if let Some(ref callback) = progress_callback {
                callback(translated.len(), total);
            }
        }

        Ok(translated)
    }

    /// Translate free text: clean it, split it into sentences, keep those
    /// within the configured character bounds and translate them
    /// `batch_size` at a time.
    pub async fn translate_text(
        &self,
        text: &str,
        target: &Lang,
        batch_size: usize,
    ) -> Result<Vec<TranslatedChunk>> {
        let cleaned = text::clean_text(text);
        let sentences = chunk::text_sentences(&cleaned, &self.config.extraction);
        debug!("Selected {} sentences from input text", sentences.len());

        let chunks = ChunkSet::new(plain_text_id(text), sentences);
        self.translate_all(&chunks, target, batch_size, None).await
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn translator_info(&self) -> TranslatorInfo {
        self.translator.info()
    }

    pub const fn scans(&self) -> &ScanCache {
        &self.scans
    }

    pub const fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Forget every cached translation, in memory and on disk
    pub fn clear_cache(&self) -> Result<usize> {
        self.cache.clear()
    }
}
