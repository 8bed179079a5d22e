use crate::config::Lang;

/// Key of one cached translation in the memory layer.
///
/// Keys are opaque MD5 hashes of all relevant inputs, ensuring:
/// - Same book + language + chunk = same key
/// - Any change to inputs produces a different key
/// - Keys are fixed-length (32 hex chars) however long the chunk is
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn new(book_id: &str, target: &Lang, chunk: &str) -> Self {
        // Null byte separators prevent collisions between inputs like
        // ("a", "bc") and ("ab", "c").
        let combined = format!("{}\0{}\0{}", book_id, target.slug(), chunk);

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// File name of the JSON cache for one book and target language.
pub fn cache_file_name(book_id: &str, target: &Lang) -> String {
    format!("{}.{}{}", book_id, target.slug(), super::json::CACHE_FILE_SUFFIX)
}
