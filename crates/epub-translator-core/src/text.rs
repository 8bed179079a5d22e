//! Plain-text processing: cleaning, sentence splitting, Arabic run detection
//! and paragraph packing.

use regex::Regex;
use std::sync::LazyLock;

/// Sentence-final punctuation (Latin and Arabic) followed by whitespace.
/// Group 1 is the whitespace that gets consumed by the split.
#[allow(clippy::expect_used)]
static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?؟۔](\s+)").expect("sentence regex is valid"));

#[allow(clippy::expect_used)]
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Characters allowed inside an Arabic run: the Arabic block, whitespace,
/// digits and anything that is not a word character.
#[allow(clippy::expect_used)]
static ARABIC_RUN_CHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{0600}-\x{06FF}\s\d\W]+").expect("arabic run regex is valid")
});

/// Split text into sentences after `.`, `!`, `?`, `؟` or `۔` followed by whitespace.
///
/// The punctuation stays with its sentence, the whitespace is dropped, and
/// blank pieces are discarded.
pub fn sentence_splitter(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for caps in SENTENCE_BREAK.captures_iter(text) {
        let Some(gap) = caps.get(1) else { continue };
        push_trimmed(&mut sentences, &text[start..gap.start()]);
        start = gap.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

/// Collapse whitespace runs and strip C0/C1 control characters.
pub fn clean_text(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    collapsed
        .chars()
        .filter(|&c| !is_control(c))
        .collect::<String>()
        .trim()
        .to_string()
}

const fn is_control(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

/// Replace every whitespace run with a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// A sentence is worth translating when it has at least `min_words` words.
pub fn is_significant(sentence: &str, min_words: usize) -> bool {
    word_count(sentence) >= min_words
}

/// Character-count filter; `None` bounds are open.
pub fn within_char_bounds(s: &str, min: Option<usize>, max: Option<usize>) -> bool {
    let len = s.chars().count();
    min.is_none_or(|min| len >= min) && max.is_none_or(|max| len <= max)
}

/// Maximal runs of Arabic text (plus digits, spaces and punctuation) that are
/// at least `min_chars` characters long, whitespace-collapsed.
pub fn arabic_runs(text: &str, min_chars: usize) -> Vec<String> {
    ARABIC_RUN_CHAR
        .find_iter(text)
        .filter(|m| m.as_str().chars().count() >= min_chars)
        .map(|m| collapse_whitespace(m.as_str()))
        .filter(|run| !run.is_empty())
        .collect()
}

/// Greedily pack paragraphs into chunks shorter than `max_chars` characters.
///
/// A paragraph that alone exceeds the limit becomes its own chunk.
pub fn pack_paragraphs<S: AsRef<str>>(paragraphs: &[S], max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for para in paragraphs {
        let para = para.as_ref();
        let para_len = para.chars().count();

        if current_len + para_len < max_chars {
            current.push_str(para);
            current.push(' ');
            current_len += para_len + 1;
        } else {
            push_trimmed(&mut chunks, &current);
            current.clear();
            current.push_str(para);
            current.push(' ');
            current_len = para_len + 1;
        }
    }
    push_trimmed(&mut chunks, &current);

    chunks
}

/// First `max_chars` characters of `s`, with `...` appended when truncated.
pub fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_splitter_latin() {
        let sentences = sentence_splitter("First one. Second one!  Third?\nFourth");
        assert_eq!(sentences, vec!["First one.", "Second one!", "Third?", "Fourth"]);
    }

    #[test]
    fn test_sentence_splitter_arabic_punctuation() {
        let text = "ما هو العلم؟ العلم نور. قال الشاعر۔ انتهى";
        let sentences = sentence_splitter(text);
        assert_eq!(
            sentences,
            vec!["ما هو العلم؟", "العلم نور.", "قال الشاعر۔", "انتهى"]
        );
    }

    #[test]
    fn test_sentence_splitter_requires_whitespace() {
        // No whitespace after the dot means no split (e.g. decimals, abbreviations)
        assert_eq!(sentence_splitter("Version 3.14 is out"), vec!["Version 3.14 is out"]);
    }

    #[test]
    fn test_sentence_splitter_blank_input() {
        assert!(sentence_splitter("   \n ").is_empty());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a\t\tb\n\nc\u{0007}d \u{0085} "), "a b cd");
    }

    #[test]
    fn test_is_significant() {
        assert!(!is_significant("two words", 3));
        assert!(is_significant("three words here", 3));
        assert!(is_significant("بسم الله الرحمن الرحيم", 3));
    }

    #[test]
    fn test_within_char_bounds_counts_chars() {
        // 5 Arabic letters, 10 bytes
        assert!(within_char_bounds("العلم", Some(5), Some(5)));
        assert!(!within_char_bounds("العلم", Some(6), None));
        assert!(within_char_bounds("anything", None, None));
    }

    #[test]
    fn test_arabic_runs_skip_latin_and_short() {
        let arabic = "الحمد لله رب العالمين، الرحمن الرحيم، مالك يوم الدين";
        let text = format!("Chapter One {arabic} end");
        let runs = arabic_runs(&text, 40);
        assert_eq!(runs.len(), 1);
        assert!(runs[0].starts_with("الحمد"));
        assert!(runs[0].ends_with("الدين"));

        assert!(arabic_runs("قصير جدا", 40).is_empty());
    }

    #[test]
    fn test_arabic_runs_collapse_whitespace() {
        let text = "الحمد   لله\n\nرب العالمين الرحمن الرحيم مالك يوم الدين";
        let runs = arabic_runs(text, 10);
        assert_eq!(runs.len(), 1);
        assert!(!runs[0].contains("  "));
        assert!(!runs[0].contains('\n'));
    }

    #[test]
    fn test_pack_paragraphs() {
        let paras = ["aaaa", "bbbb", "cccc"];
        // "aaaa " (5) + 4 < 10 -> pack; then 10 + 4 >= 10 -> flush
        assert_eq!(pack_paragraphs(&paras, 10), vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn test_pack_paragraphs_oversized_first_does_not_emit_empty() {
        let paras = ["a very long paragraph", "b"];
        assert_eq!(pack_paragraphs(&paras, 5), vec!["a very long paragraph", "b"]);
    }

    #[test]
    fn test_pack_paragraphs_empty() {
        let paras: [&str; 0] = [];
        assert!(pack_paragraphs(&paras, 256).is_empty());
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("hello world", 5), "hello...");
        assert_eq!(preview("hi", 5), "hi");
        assert_eq!(preview("العلم نور", 5), "العلم...");
    }
}
