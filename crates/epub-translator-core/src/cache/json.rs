use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};

/// Suffix shared by every translation cache file
pub const CACHE_FILE_SUFFIX: &str = ".translation_cache.json";

/// One flat `{ "source chunk": "translation" }` JSON file.
pub struct JsonCacheFile {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonCacheFile {
    /// Load the cache at `path`.
    ///
    /// A missing file is an empty cache. An unreadable or corrupt file is
    /// logged and treated as empty; it gets overwritten on the next insert.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => {
                    debug!("Loaded {} cached translations from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    warn!(
                        "Could not parse cache file {}: {}. Starting with an empty cache.",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(
                    "Could not read cache file {}: {}. Starting with an empty cache.",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };

        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }

    /// Insert and persist immediately.
    pub fn insert(&mut self, source: &str, translation: &str) -> Result<()> {
        self.entries.insert(source.to_string(), translation.to_string());
        self.persist().inspect_err(|e| {
            error!("Could not save cache file {}: {}", self.path.display(), e);
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Write to a sibling temp file then rename, so readers never see a
    /// half-written file.
    fn persist(&self) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.entries
            .serialize(&mut serializer)
            .map_err(|e| Error::CacheWrite(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &buf)
            .map_err(|e| Error::CacheWrite(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| Error::CacheWrite(format!("{}: {e}", self.path.display())))?;

        Ok(())
    }
}
