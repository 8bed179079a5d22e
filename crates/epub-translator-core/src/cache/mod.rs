mod json;
mod key;
mod memory;
mod scan;

pub use json::{CACHE_FILE_SUFFIX, JsonCacheFile};
pub use key::{CacheKey, cache_file_name};
pub use memory::MemoryCache;
pub use scan::ScanCache;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{CacheConfig, Lang};
use crate::error::{Error, Result};

/// JSON files under one directory, read on every lookup and reloaded
/// before every write.
///
/// Files are not kept in memory, so entries removed on disk (for example by
/// `clear_translation_cache` from another process) are neither served nor
/// written back. Each file has its own write lock so concurrent inserts into
/// the same book are serialized while different books proceed independently.
struct DiskCache {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DiskCache {
    fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::CacheInit(format!(
                "Failed to create cache directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        debug!("Using translation cache directory {}", dir.display());

        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn open(&self, book_id: &str, target: &Lang) -> JsonCacheFile {
        JsonCacheFile::open(self.dir.join(cache_file_name(book_id, target)))
    }

    /// Write lock of one file. Locks nobody holds or waits on are dropped
    /// from the map, so it only holds files with writes in progress.
    async fn write_lock(&self, book_id: &str, target: &Lang) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(cache_file_name(book_id, target)).or_default())
    }

    async fn insert(&self, book_id: &str, target: &Lang, chunk: &str, translation: &str) -> Result<()> {
        let lock = self.write_lock(book_id, target).await;
        let _guard = lock.lock().await;
        self.open(book_id, target).insert(chunk, translation)
    }
}

/// Combined cache with memory and JSON file layers
pub struct TranslationCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration
    pub fn new(config: &CacheConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let memory = config
            .memory_enabled
            .then(|| MemoryCache::new(config.memory_max_entries, config.memory_ttl_seconds));

        Ok(Self {
            memory,
            disk: Some(DiskCache::new(config.resolved_dir())?),
        })
    }

    /// A cache that never hits and never stores
    pub const fn disabled() -> Self {
        Self {
            memory: None,
            disk: None,
        }
    }

    /// Directory of the JSON files, if the disk layer is on
    pub fn dir(&self) -> Option<&Path> {
        self.disk.as_ref().map(|disk| disk.dir.as_path())
    }

    /// Get a cached translation
    pub async fn get(&self, book_id: &str, target: &Lang, chunk: &str) -> Option<String> {
        let key = CacheKey::new(book_id, target, chunk).to_string();

        // Try memory cache first
        if let Some(ref memory) = self.memory
            && let Some(value) = memory.get(&key).await
        {
            return Some(value);
        }

        // Try disk cache
        if let Some(ref disk) = self.disk {
            if let Some(value) = disk.open(book_id, target).get(chunk).map(str::to_string) {
                // Populate memory cache on disk hit
                if let Some(ref memory) = self.memory {
                    memory.insert(key, value.clone()).await;
                }
                return Some(value);
            }
        }

        None
    }

    /// Store a translation in cache.
    ///
    /// The memory layer is always updated; a failed file write is returned
    /// so callers can decide whether it matters.
    pub async fn insert(
        &self,
        book_id: &str,
        target: &Lang,
        chunk: &str,
        translation: &str,
    ) -> Result<()> {
        if let Some(ref memory) = self.memory {
            let key = CacheKey::new(book_id, target, chunk).to_string();
            memory.insert(key, translation.to_string()).await;
        }

        if let Some(ref disk) = self.disk {
            disk.insert(book_id, target, chunk, translation).await?;
        }

        Ok(())
    }

    /// Number of translations stored on disk for a book and language
    pub async fn stored_count(&self, book_id: &str, target: &Lang) -> usize {
        match self.disk {
            Some(ref disk) => disk.open(book_id, target).len(),
            None => 0,
        }
    }

    /// Drop the memory layer (files are kept)
    pub fn clear_memory(&self) {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }
    }

    /// Drop the memory layer and delete every cache file.
    ///
    /// Returns the number of files removed.
    pub fn clear(&self) -> Result<usize> {
        self.clear_memory();
        match self.disk {
            Some(ref disk) => clear_translation_cache(&disk.dir),
            None => Ok(0),
        }
    }
}

/// Delete every translation cache file in `dir`.
///
/// Returns the number of files removed.
pub fn clear_translation_cache(dir: impl AsRef<Path>) -> Result<usize> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_cache_file = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(CACHE_FILE_SUFFIX));

        if is_cache_file && path.is_file() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    debug!("Removed {} cache files from {}", removed, dir.display());
    Ok(removed)
}
