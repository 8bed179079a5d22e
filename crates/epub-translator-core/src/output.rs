//! Rendering translated chunks for humans and for training data.

use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::time::Duration;

use crate::TranslatedChunk;
use crate::error::Result;

/// Two-row aligned table, one block per chunk:
///
/// ```text
/// | source      |
/// | translation |
/// +-------------+
/// ```
pub fn format_table(chunks: &[TranslatedChunk]) -> String {
    let width = chunks
        .iter()
        .map(|c| c.original.chars().count().max(c.translation.chars().count()))
        .max()
        .unwrap_or(0);
    let border = format!("+{}+", "-".repeat(width + 2));

    chunks
        .iter()
        .map(|c| {
            format!(
                "| {:<width$} |\n| {:<width$} |\n{}",
                c.original, c.translation, border
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct CorpusLine<'a> {
    source: &'a str,
    target: &'a str,
}

/// One `{"source", "target"}` JSON object per line.
pub fn write_jsonl<W: Write>(chunks: &[TranslatedChunk], mut writer: W) -> Result<()> {
    for chunk in chunks {
        let line = CorpusLine {
            source: &chunk.original,
            target: &chunk.translation,
        };
        serde_json::to_writer(&mut writer, &line).map_err(std::io::Error::other)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// `#n`, original, translation and a blank line per chunk.
pub fn write_bilingual_text<W: Write>(chunks: &[TranslatedChunk], mut writer: W) -> Result<()> {
    for chunk in chunks {
        writeln!(writer, "#{}", chunk.number)?;
        writeln!(writer, "{}", chunk.original)?;
        writeln!(writer, "{}", chunk.translation)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Throughput of a translation run
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    pub count: usize,
    pub elapsed: Duration,
}

impl Stats {
    pub const fn new(count: usize, elapsed: Duration) -> Self {
        Self { count, elapsed }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.count as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total time: {:.2} seconds", self.elapsed.as_secs_f64())?;
        writeln!(f, "Sentences: {}", self.count)?;
        write!(f, "Speed: {:.2} sentences/second", self.per_second())
    }
}
