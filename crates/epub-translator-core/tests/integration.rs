//! Integration tests for epub-translator-core
//!
//! These tests verify the end-to-end workflow:
//! - EPUB loading and chunk extraction
//! - Translation with mock backend
//! - Cache hits, misses and persistence
//! - Batch and plain-text translation

use async_trait::async_trait;
use epub_translator_core::{
    AppConfig, BookTranslator, CacheConfig, ChunkStrategy, EpubBook, Error, Lang, Result,
    Translator, TranslatorInfo, output, plain_text_id,
};
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use zip::write::SimpleFileOptions;

// =============================================================================
// Mock Translator for Testing
// =============================================================================

/// A mock translator that returns predictable translations without network calls.
/// Useful for testing the translation pipeline in isolation.
struct MockTranslator {
    /// Prefix to add to translations for verification
    prefix: String,
    /// Simulate failure if true
    should_fail: bool,
    /// Simulated latency per request
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTranslator {
    fn new() -> Self {
        Self {
            prefix: "[TRANSLATED]".to_string(),
            should_fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            prefix: String::new(),
            should_fail: true,
            ..Self::new()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, target: &Lang) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(Error::TranslationRequest("Mock translation failure".to_string()));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(format!("{} ({}) {}", self.prefix, target, text))
    }

    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "mock",
            model: "mock-model".to_string(),
        }
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;

const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>كتاب الاختبار</dc:title>
    <dc:language>ar</dc:language>
  </metadata>
  <manifest>
    <item id="c1" href="Text/chapter1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="Text/chapter2.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>
  </manifest>
  <spine><itemref idref="c1"/><itemref idref="c2"/></spine>
</package>"#;

const CHAPTER_1: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Chapter One</title></head>
<body>
  <p>قال النبي صلى الله عليه وسلم. الحمد لله رب العالمين. نعم.</p>
  <p>الحمد لله رب العالمين.</p>
</body></html>"#;

const CHAPTER_2: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><script>var x = "one two three four.";</script></head>
<body><p>طلب العلم فريضة على كل مسلم.</p></body></html>"#;

/// Build a small two-chapter Arabic EPUB in memory
fn test_epub() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut out);
        for (name, content) in [
            ("mimetype", "application/epub+zip"),
            ("META-INF/container.xml", CONTAINER),
            ("OEBPS/content.opf", OPF),
            ("OEBPS/Text/chapter1.xhtml", CHAPTER_1),
            ("OEBPS/Text/chapter2.xhtml", CHAPTER_2),
            ("OEBPS/style.css", "p { margin: 0; }"),
        ] {
            zip.start_file(name, SimpleFileOptions::default())
                .expect("start zip entry");
            zip.write_all(content.as_bytes()).expect("write zip entry");
        }
        zip.finish().expect("finish zip");
    }
    out.into_inner()
}

fn load_test_book() -> EpubBook {
    EpubBook::from_bytes(test_epub()).expect("Failed to load test EPUB")
}

/// Create a minimal test configuration with the JSON cache in `dir`
fn test_config(dir: &std::path::Path) -> AppConfig {
    AppConfig {
        cache: CacheConfig {
            dir: Some(dir.to_path_buf()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn english() -> Lang {
    Lang::new("English")
}

// =============================================================================
// EPUB Loading and Scanning Tests
// =============================================================================

#[test]
fn test_epub_loads_successfully() {
    let book = load_test_book();
    assert_eq!(book.documents().len(), 2, "Stylesheets are not documents");
    assert_eq!(book.metadata().title.as_deref(), Some("كتاب الاختبار"));
}

#[test]
fn test_invalid_epub_is_invalid_input() {
    let err = EpubBook::from_bytes(b"PK not really".to_vec()).unwrap_err();
    assert!(err.is_invalid_input(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_scan_sentences_are_unique_sorted_and_significant() {
    let dir = tempfile::tempdir().unwrap();
    let translator =
        BookTranslator::with_translator(Arc::new(MockTranslator::new()), test_config(dir.path()))
            .unwrap();

    let chunks = translator.scan(&load_test_book()).await;
    let sentences: Vec<&str> = chunks.iter().map(|(_, s)| s).collect();

    assert_eq!(
        sentences,
        vec![
            "الحمد لله رب العالمين.",
            "طلب العلم فريضة على كل مسلم.",
            "قال النبي صلى الله عليه وسلم.",
        ]
    );
}

#[tokio::test]
async fn test_scan_is_cached_by_content() {
    let dir = tempfile::tempdir().unwrap();
    let translator =
        BookTranslator::with_translator(Arc::new(MockTranslator::new()), test_config(dir.path()))
            .unwrap();
    let book = load_test_book();

    let first = translator.scan(&book).await;
    assert!(translator.scans().get(book.content_id()).await.is_some());
    let second = translator.scan(&book).await;
    assert_eq!(first.len(), second.len());
    assert_eq!(second.book_id(), book.content_id());
}

#[tokio::test]
async fn test_scan_paragraphs_keeps_long_runs_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.extraction.strategy = ChunkStrategy::Paragraphs;
    let translator =
        BookTranslator::with_translator(Arc::new(MockTranslator::new()), config).unwrap();

    let chunks = translator.scan(&load_test_book()).await;
    assert_eq!(chunks.len(), 1);
    let chunk = chunks.get(1).unwrap();
    assert!(chunk.starts_with("قال النبي"));
    // Chapter 2 is shorter than the minimum run length
    assert!(!chunk.contains("طلب العلم"));
    // Script content never leaks into chunks
    assert!(!chunk.contains("var x"));
}

// =============================================================================
// Translation Pipeline Tests
// =============================================================================

#[tokio::test]
async fn test_translate_chunk_with_mock() {
    let dir = tempfile::tempdir().unwrap();
    let translator =
        BookTranslator::with_translator(Arc::new(MockTranslator::new()), test_config(dir.path()))
            .unwrap();
    let chunks = translator.scan(&load_test_book()).await;

    let result = translator.translate_chunk(&chunks, 2, &english()).await;
    assert!(result.is_ok(), "Translation should succeed: {:?}", result.err());

    let translated = result.unwrap();
    assert_eq!(translated.number, 2);
    assert_eq!(translated.original, "طلب العلم فريضة على كل مسلم.");
    assert_eq!(
        translated.translation,
        "[TRANSLATED] (English) طلب العلم فريضة على كل مسلم."
    );
    assert!(!translated.from_cache, "First translation should not be from cache");
}

#[tokio::test]
async fn test_cache_hit_on_second_translation() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockTranslator::new());
    let translator =
        BookTranslator::with_translator(mock.clone(), test_config(dir.path())).unwrap();
    let chunks = translator.scan(&load_test_book()).await;

    let first = translator.translate_chunk(&chunks, 1, &english()).await.unwrap();
    let second = translator.translate_chunk(&chunks, 1, &english()).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache, "Second translation should be from cache");
    assert_eq!(first.translation, second.translation);
    assert_eq!(mock.calls(), 1);

    // Another language is a cache miss
    let malay = translator
        .translate_chunk(&chunks, 1, &Lang::new("Malay"))
        .await
        .unwrap();
    assert!(!malay.from_cache);
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn test_force_bypasses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockTranslator::new());
    let translator =
        BookTranslator::with_translator(mock.clone(), test_config(dir.path())).unwrap();
    let chunks = translator.scan(&load_test_book()).await;

    translator.translate_chunk(&chunks, 1, &english()).await.unwrap();
    let forced = translator
        .translate_chunk_force(&chunks, 1, &english())
        .await
        .unwrap();

    assert!(!forced.from_cache);
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn test_cache_persists_as_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let book = load_test_book();
    {
        let translator = BookTranslator::with_translator(
            Arc::new(MockTranslator::new()),
            test_config(dir.path()),
        )
        .unwrap();
        let chunks = translator.scan(&book).await;
        translator.translate_chunk(&chunks, 3, &english()).await.unwrap();
    }

    let path = dir
        .path()
        .join(format!("{}.english.translation_cache.json", book.content_id()));
    let raw = std::fs::read_to_string(&path).expect("cache file should exist");
    let entries: std::collections::BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        entries.get("قال النبي صلى الله عليه وسلم.").map(String::as_str),
        Some("[TRANSLATED] (English) قال النبي صلى الله عليه وسلم.")
    );

    // A fresh translator with a failing backend is served from the file
    let translator =
        BookTranslator::with_translator(Arc::new(MockTranslator::failing()), test_config(dir.path()))
            .unwrap();
    let chunks = translator.scan(&book).await;
    let cached = translator.translate_chunk(&chunks, 3, &english()).await.unwrap();
    assert!(cached.from_cache);
}

#[tokio::test]
async fn test_disabled_cache_always_translates() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.cache.enabled = false;
    let mock = Arc::new(MockTranslator::new());
    let translator = BookTranslator::with_translator(mock.clone(), config).unwrap();
    let chunks = translator.scan(&load_test_book()).await;

    translator.translate_chunk(&chunks, 1, &english()).await.unwrap();
    let second = translator.translate_chunk(&chunks, 1, &english()).await.unwrap();
    assert!(!second.from_cache);
    assert_eq!(mock.calls(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_translation_error_handling() {
    let dir = tempfile::tempdir().unwrap();
    let translator =
        BookTranslator::with_translator(Arc::new(MockTranslator::failing()), test_config(dir.path()))
            .unwrap();
    let chunks = translator.scan(&load_test_book()).await;

    let result = translator.translate_chunk(&chunks, 1, &english()).await;
    assert!(matches!(result, Err(Error::TranslationRequest(_))));

    // Failures are never cached
    let mock = Arc::new(MockTranslator::new());
    let retry = BookTranslator::with_translator(mock, test_config(dir.path())).unwrap();
    let ok = retry.translate_chunk(&chunks, 1, &english()).await.unwrap();
    assert!(!ok.from_cache);
}

#[tokio::test]
async fn test_chunk_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockTranslator::new());
    let translator =
        BookTranslator::with_translator(mock.clone(), test_config(dir.path())).unwrap();
    let chunks = translator.scan(&load_test_book()).await;

    for number in [0, 4] {
        let err = translator
            .translate_chunk(&chunks, number, &english())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChunkOutOfRange { total: 3, .. }));
    }
    assert_eq!(mock.calls(), 0, "Out-of-range chunks never reach the backend");
}

// =============================================================================
// Batch Translation Tests
// =============================================================================

#[tokio::test]
async fn test_translate_all_keeps_order_and_bounds_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockTranslator::slow(Duration::from_millis(20)));
    let translator =
        BookTranslator::with_translator(mock.clone(), test_config(dir.path())).unwrap();
    let chunks = translator.scan(&load_test_book()).await;

    let progress = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&progress);
    let results = translator
        .translate_all(
            &chunks,
            &english(),
            2,
            Some(Box::new(move |done, total| {
                assert_eq!(total, 3);
                seen.store(done, Ordering::SeqCst);
            })),
        )
        .await
        .unwrap();

    let numbers: Vec<usize> = results.iter().map(|r| r.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    for (result, (_, original)) in results.iter().zip(chunks.iter()) {
        assert_eq!(result.original, original);
    }
    assert_eq!(progress.load(Ordering::SeqCst), 3);
    assert!(mock.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_translate_all_aborts_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let translator =
        BookTranslator::with_translator(Arc::new(MockTranslator::failing()), test_config(dir.path()))
            .unwrap();
    let chunks = translator.scan(&load_test_book()).await;

    let result = translator.translate_all(&chunks, &english(), 4, None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_translate_text_filters_and_formats() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.extraction.min_sentence_chars = Some(15);
    config.extraction.max_sentence_chars = Some(300);
    let translator =
        BookTranslator::with_translator(Arc::new(MockTranslator::new()), config).unwrap();

    let input = "العلم نور والجهل ظلام.\u{0007}  قصير.\n\nالاستغفارات المتواترات. من جد وجد ومن زرع حصد!";
    let results = translator.translate_text(input, &english(), 4).await.unwrap();

    // Only the character bounds apply; two-word sentences are kept
    let originals: Vec<&str> = results.iter().map(|r| r.original.as_str()).collect();
    assert_eq!(
        originals,
        vec![
            "العلم نور والجهل ظلام.",
            "الاستغفارات المتواترات.",
            "من جد وجد ومن زرع حصد!"
        ]
    );

    let table = output::format_table(&results);
    assert_eq!(table.lines().count(), 9);
    assert!(table.lines().all(|line| line.starts_with('|') || line.starts_with('+')));
}

#[tokio::test]
async fn test_translate_text_caches_per_input() {
    let dir = tempfile::tempdir().unwrap();
    let translator =
        BookTranslator::with_translator(Arc::new(MockTranslator::new()), test_config(dir.path()))
            .unwrap();

    let first = "العلم نور والجهل ظلام.";
    let second = "من جد وجد ومن زرع حصد!";
    translator.translate_text(first, &english(), 1).await.unwrap();
    translator.translate_text(second, &english(), 1).await.unwrap();

    let mut files: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();

    let mut expected = vec![
        format!("{}.english.translation_cache.json", plain_text_id(first)),
        format!("{}.english.translation_cache.json", plain_text_id(second)),
    ];
    expected.sort();
    assert_eq!(files, expected);
    assert!(files.iter().all(|name| name.starts_with("text-")));
}
