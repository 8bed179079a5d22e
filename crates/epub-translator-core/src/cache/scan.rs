use moka::future::Cache;
use std::time::Duration;

use crate::chunk::ChunkSet;
use crate::config::CacheConfig;

/// Scanned books by content id, so re-uploading a book skips extraction.
#[derive(Clone)]
pub struct ScanCache {
    cache: Cache<String, ChunkSet>,
}

impl ScanCache {
    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.scan_max_books);

        if config.scan_ttl_seconds > 0 {
            builder = builder.time_to_live(Duration::from_secs(config.scan_ttl_seconds));
        }

        Self {
            cache: builder.build(),
        }
    }

    pub async fn get(&self, book_id: &str) -> Option<ChunkSet> {
        self.cache.get(book_id).await
    }

    pub async fn insert(&self, chunks: ChunkSet) {
        self.cache.insert(chunks.book_id().to_string(), chunks).await;
    }
}
