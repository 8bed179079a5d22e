//! Parsing of `META-INF/container.xml` and the OPF package document.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

/// Dublin Core metadata from the package document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

impl ManifestItem {
    /// XHTML/HTML content document (ebooklib's ITEM_DOCUMENT)
    pub fn is_document(&self) -> bool {
        matches!(
            self.media_type.to_ascii_lowercase().as_str(),
            "application/xhtml+xml" | "text/html"
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Package {
    pub metadata: BookMetadata,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<String>,
}

impl Package {
    /// Content documents in reading order: spine first, then any document
    /// items the spine does not reference.
    pub fn document_order(&self) -> Vec<&ManifestItem> {
        let mut ordered: Vec<&ManifestItem> = self
            .spine
            .iter()
            .filter_map(|idref| self.manifest.iter().find(|item| &item.id == idref))
            .filter(|item| item.is_document())
            .collect();

        for item in self.manifest.iter().filter(|item| item.is_document()) {
            if !ordered.iter().any(|seen| seen.id == item.id) {
                ordered.push(item);
            }
        }

        ordered
    }
}

/// First `rootfile@full-path` in the OCF container document.
pub fn parse_container(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attr(&e, b"full-path") {
                    return Ok(Some(path));
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => {
                return Err(Error::EpubStructure(format!("invalid container.xml: {e}")));
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MetaField {
    Title,
    Creator,
    Language,
}

/// Parse the OPF package document.
pub fn parse_package(xml: &str) -> Result<Package> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut package = Package::default();
    let mut in_metadata = false;
    let mut field: Option<MetaField> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::EpubStructure(format!("invalid package document: {e}")))?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"metadata" => in_metadata = true,
                b"title" if in_metadata => field = Some(MetaField::Title),
                b"creator" if in_metadata => field = Some(MetaField::Creator),
                b"language" if in_metadata => field = Some(MetaField::Language),
                b"item" => push_item(&mut package, &e),
                b"itemref" => push_itemref(&mut package, &e),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"item" => push_item(&mut package, &e),
                b"itemref" => push_itemref(&mut package, &e),
                _ => {}
            },
            Event::Text(t) => {
                if let Some(f) = field {
                    let text = t
                        .unescape()
                        .map_or_else(|_| String::from_utf8_lossy(&t).into_owned(), |s| s.into_owned());
                    let slot = match f {
                        MetaField::Title => &mut package.metadata.title,
                        MetaField::Creator => &mut package.metadata.creator,
                        MetaField::Language => &mut package.metadata.language,
                    };
                    // Keep the first occurrence of each field
                    if slot.is_none() && !text.trim().is_empty() {
                        *slot = Some(text.trim().to_string());
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"metadata" => in_metadata = false,
                b"title" | b"creator" | b"language" => field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(package)
}

fn push_item(package: &mut Package, e: &BytesStart<'_>) {
    if let (Some(id), Some(href)) = (attr(e, b"id"), attr(e, b"href")) {
        package.manifest.push(ManifestItem {
            id,
            href,
            media_type: attr(e, b"media-type").unwrap_or_default(),
        });
    }
}

fn push_itemref(package: &mut Package, e: &BytesStart<'_>) {
    if let Some(idref) = attr(e, b"idref") {
        package.spine.push(idref);
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Resolve `href` (relative to the package document at `opf_path`) to a zip
/// entry name. Fragments are dropped, `.`/`..` segments normalized, and
/// percent-escapes decoded.
pub fn resolve_href(opf_path: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let href = urlencoding::decode(href).map_or_else(|_| href.to_string(), |s| s.into_owned());

    let mut segments: Vec<&str> = match opf_path.rfind('/') {
        Some(idx) => opf_path[..idx].split('/').collect(),
        None => Vec::new(),
    };

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}
