//! Cutting a book into translation units ("chunks").

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::config::{ChunkStrategy, ExtractionConfig};
use crate::epub::EpubBook;
use crate::error::{Error, Result};
use crate::text;

/// The chunks of one book, numbered from 1.
///
/// Cloning is O(1).
#[derive(Debug, Clone)]
pub struct ChunkSet {
    book_id: String,
    chunks: Arc<Vec<String>>,
}

impl ChunkSet {
    pub fn new(book_id: impl Into<String>, chunks: Vec<String>) -> Self {
        Self {
            book_id: book_id.into(),
            chunks: Arc::new(chunks),
        }
    }

    /// Identifier of the source (EPUB content hash)
    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk by 1-based number.
    pub fn get(&self, number: usize) -> Result<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.chunks.get(idx))
            .map(String::as_str)
            .ok_or(Error::ChunkOutOfRange {
                number,
                total: self.chunks.len(),
            })
    }

    /// `(number, chunk)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| (idx + 1, chunk.as_str()))
    }
}

/// Extract the chunks of `book` according to `config`.
pub fn scan(book: &EpubBook, config: &ExtractionConfig) -> ChunkSet {
    let chunks = match config.strategy {
        ChunkStrategy::Sentences => unique_sentences(book, config),
        ChunkStrategy::Paragraphs => packed_paragraphs(book, config),
    };

    info!(
        "Scanned {} documents of {}: {} chunks ({:?})",
        book.documents().len(),
        crate::util::short_id(book.content_id()),
        chunks.len(),
        config.strategy
    );

    ChunkSet::new(book.content_id(), chunks)
}

/// Unique significant sentences of every text node, sorted so numbering is
/// stable across runs.
fn unique_sentences(book: &EpubBook, config: &ExtractionConfig) -> Vec<String> {
    let mut sentences = BTreeSet::new();

    for document in book.documents() {
        for node in document.text_nodes() {
            sentences.extend(select_sentences(&node, config));
        }
    }

    sentences.into_iter().collect()
}

/// Sentences of `text` that pass the word-count and character filters.
pub fn select_sentences(text: &str, config: &ExtractionConfig) -> Vec<String> {
    text::sentence_splitter(text)
        .into_iter()
        .filter(|s| text::is_significant(s, config.min_words))
        .filter(|s| text::within_char_bounds(s, config.min_sentence_chars, config.max_sentence_chars))
        .collect()
}

/// Sentences of free text: only the character bounds apply, short sentences
/// of a word or two are kept.
pub fn text_sentences(text: &str, config: &ExtractionConfig) -> Vec<String> {
    text::sentence_splitter(text)
        .into_iter()
        .filter(|s| text::within_char_bounds(s, config.min_sentence_chars, config.max_sentence_chars))
        .collect()
}

/// Arabic runs of each document packed into chunks, in reading order.
fn packed_paragraphs(book: &EpubBook, config: &ExtractionConfig) -> Vec<String> {
    let paragraphs: Vec<String> = book
        .documents()
        .iter()
        .flat_map(|document| text::arabic_runs(&document.text(), config.min_run_chars))
        .collect();

    text::pack_paragraphs(&paragraphs, config.max_chunk_chars)
}
