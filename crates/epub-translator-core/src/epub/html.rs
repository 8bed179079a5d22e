//! Text extraction from XHTML content documents.
//!
//! Content documents are walked as an event stream. Each non-blank text node
//! is kept, in document order; `script` and `style` bodies and comments are
//! skipped. End-tag checking is relaxed so that HTML-ish documents with void
//! elements (`<br>`, `<img>`) still parse.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use std::borrow::Cow;
use tracing::warn;

/// Every non-blank, trimmed text node of a content document.
pub fn text_nodes(html: &[u8]) -> Vec<String> {
    let source = String::from_utf8_lossy(html);
    let source = source.trim_start_matches('\u{feff}');

    let mut reader = Reader::from_str(source);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;

    let mut nodes = Vec::new();
    // Depth inside script/style elements
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if is_skipped(e.local_name().as_ref()) {
                    skip_depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                if is_skipped(e.local_name().as_ref()) {
                    skip_depth = skip_depth.saturating_sub(1);
                }
            }
            Ok(Event::Text(t)) if skip_depth == 0 => {
                let text = t.unescape_with(resolve_html_entity).map_or_else(
                    |_| Cow::Owned(unescape_lenient(&String::from_utf8_lossy(&t))),
                    |s| s,
                );
                push_node(&mut nodes, &text);
            }
            Ok(Event::CData(t)) if skip_depth == 0 => {
                push_node(&mut nodes, &String::from_utf8_lossy(&t));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(
                    "Malformed markup at byte {}, keeping {} text nodes: {}",
                    reader.buffer_position(),
                    nodes.len(),
                    e
                );
                break;
            }
        }
    }

    nodes
}

/// All text of a document joined with single spaces.
pub fn document_text(html: &[u8]) -> String {
    text_nodes(html).join(" ")
}

fn is_skipped(name: &[u8]) -> bool {
    name.eq_ignore_ascii_case(b"script") || name.eq_ignore_ascii_case(b"style")
}

fn push_node(nodes: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        nodes.push(text.to_string());
    }
}

/// Decode entity by entity, keeping references that do not resolve verbatim.
fn unescape_lenient(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };

        let name = &tail[1..end];
        match resolve_reference(name) {
            Some(resolved) => out.push_str(&resolved),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    out
}

/// A named entity or a `#N` / `#xH` character reference.
fn resolve_reference(name: &str) -> Option<Cow<'static, str>> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse::<u32>().ok()?,
        };
        return char::from_u32(value).map(|c| Cow::Owned(c.to_string()));
    }
    resolve_html_entity(name).map(Cow::Borrowed)
}

/// XML predefined entities plus the HTML named entities that show up in
/// EPUB content.
fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    if let Some(predefined) = resolve_predefined_entity(entity) {
        return Some(predefined);
    }
    let resolved = match entity {
        "nbsp" => "\u{a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "zwnj" => "\u{200c}",
        "zwj" => "\u{200d}",
        "lrm" => "\u{200e}",
        "rlm" => "\u{200f}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{b7}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "deg" => "\u{b0}",
        "shy" => "\u{ad}",
        _ => return None,
    };
    Some(resolved)
}
