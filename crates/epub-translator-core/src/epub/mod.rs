//! EPUB container reading.

pub mod html;
mod package;

pub use package::{BookMetadata, ManifestItem, resolve_href};

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// A content document (chapter) of an EPUB
#[derive(Debug, Clone)]
pub struct EpubDocument {
    /// Zip entry name of the document
    pub href: String,
    pub content: Vec<u8>,
}

impl EpubDocument {
    pub fn text_nodes(&self) -> Vec<String> {
        html::text_nodes(&self.content)
    }

    pub fn text(&self) -> String {
        html::document_text(&self.content)
    }
}

/// An opened EPUB with its content documents loaded in reading order.
///
/// Cloning is O(1): documents are shared behind an `Arc`.
#[derive(Clone)]
pub struct EpubBook {
    metadata: BookMetadata,
    documents: Arc<Vec<EpubDocument>>,
    /// SHA-256 hex of the raw bytes, computed once on load
    content_id: String,
    size: usize,
}

impl EpubBook {
    /// Open an EPUB from bytes
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let bytes = bytes.as_ref();
        let content_id = crate::util::sha256_hex(bytes);

        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::EpubOpen(format!("not a zip archive: {e}")))?;

        let opf_path = match read_entry_string(&mut archive, CONTAINER_PATH) {
            Ok(container) => package::parse_container(&container)?,
            Err(e) => {
                warn!("{e}; looking for a package document directly");
                None
            }
        }
        .or_else(|| first_opf_entry(&archive))
        .ok_or_else(|| Error::EpubStructure("no package document (.opf) found".to_string()))?;

        debug!("Package document at {}", opf_path);
        let package = package::parse_package(&read_entry_string(&mut archive, &opf_path)?)?;

        let mut documents = Vec::new();
        for item in package.document_order() {
            let href = resolve_href(&opf_path, &item.href);
            match read_entry(&mut archive, &href) {
                Ok(content) => documents.push(EpubDocument { href, content }),
                Err(e) => warn!("Skipping document '{}': {}", item.id, e),
            }
        }

        debug!(
            "Loaded EPUB {} with {} documents",
            crate::util::short_id(&content_id),
            documents.len()
        );

        Ok(Self {
            metadata: package.metadata,
            documents: Arc::new(documents),
            content_id,
            size: bytes.len(),
        })
    }

    /// Open an EPUB from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            Error::EpubOpen(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    pub const fn metadata(&self) -> &BookMetadata {
        &self.metadata
    }

    /// Content documents in reading order
    pub fn documents(&self) -> &[EpubDocument] {
        &self.documents
    }

    /// Content-based identifier (SHA-256 hex of the EPUB bytes).
    ///
    /// Used as the file id of the HTTP API and as the translation cache name.
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub const fn size(&self) -> usize {
        self.size
    }
}

impl std::fmt::Debug for EpubBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpubBook")
            .field("content_id", &self.content_id)
            .field("metadata", &self.metadata)
            .field("documents", &self.documents.len())
            .field("size", &self.size)
            .finish()
    }
}

fn read_entry<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name).map_err(|e| Error::EpubEntry {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).map_err(|e| Error::EpubEntry {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok(data)
}

fn read_entry_string<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String> {
    let data = read_entry(archive, name)?;
    Ok(String::from_utf8_lossy(&data).trim_start_matches('\u{feff}').to_string())
}

fn first_opf_entry<R: Read + std::io::Seek>(archive: &ZipArchive<R>) -> Option<String> {
    archive
        .file_names()
        .filter(|name| name.to_ascii_lowercase().ends_with(".opf"))
        .min()
        .map(str::to_string)
}
