//! CSV file parsing for the static fallback store.
//!
//! The fallback files are Embrapa exports: usually semicolon-delimited,
//! sometimes Latin-1 encoded, with a single header row and totals rows
//! mixed into the data. Parsing shapes them into the same [`TableRecord`]
//! the scraper produces so callers cannot tell the sources apart.

use std::path::Path;

use tracing::warn;

use crate::record::{BodyGroup, TableRecord};

/// Keywords (lowercase) that mark a row as a totals/footer row when they
/// appear in its first cell.
const FOOTER_KEYWORDS: &[&str] = &[
    "total",
    "soma",
    "subtotal",
    "geral",
    "consolidado",
    "média",
    "media",
];

/// Delimiters tried when sniffing, in preference order. Semicolon first:
/// it is what the Embrapa exports actually use.
const DELIMITERS: &[u8] = b";,\t|";

/// Why a fallback file yielded no record.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("file not readable: {0}")]
    Io(String),
    #[error("file could not be parsed: {0}")]
    Parse(String),
}

/// Load and parse one fallback CSV file.
///
/// An empty file parses to an empty record; the store treats that as a
/// miss at lookup time.
pub(crate) fn load_table(path: &Path) -> Result<TableRecord, TableError> {
    let bytes = std::fs::read(path).map_err(|e| TableError::Io(e.to_string()))?;
    if bytes.is_empty() {
        warn!(path = %path.display(), "Fallback file is empty");
        return Ok(TableRecord::default());
    }

    let text = decode(&bytes);
    let delimiter = sniff_delimiter(text.lines().next().unwrap_or(""));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        match result {
            Ok(record) => {
                let cells: Vec<String> = record
                    .iter()
                    .map(|cell| cell.trim().to_string())
                    .collect();
                // Keep rows that carry at least one non-empty value.
                if cells.iter().any(|c| !c.is_empty()) {
                    rows.push(cells);
                }
            }
            Err(e) => {
                skipped += 1;
                warn!(path = %path.display(), "Skipping malformed row: {e}");
            }
        }
    }

    if rows.is_empty() {
        if skipped > 0 {
            return Err(TableError::Parse(format!(
                "no valid rows ({skipped} malformed)"
            )));
        }
        return Ok(TableRecord::default());
    }

    let mut record = TableRecord {
        header: vec![rows.remove(0)],
        ..TableRecord::default()
    };
    for row in rows {
        if is_footer_row(&row) {
            record.footer.push(row);
        } else {
            record.body.push(BodyGroup {
                item_data: row,
                sub_items: Vec::new(),
            });
        }
    }

    Ok(record)
}

/// UTF-8 with Latin-1 fallback. Every byte is a valid Latin-1 code point,
/// so the fallback cannot fail.
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Pick the candidate delimiter that occurs most often in the first line.
fn sniff_delimiter(first_line: &str) -> u8 {
    DELIMITERS
        .iter()
        .copied()
        .max_by_key(|&d| first_line.bytes().filter(|&b| b == d).count())
        .unwrap_or(b';')
}

fn is_footer_row(row: &[String]) -> bool {
    let Some(first) = row.first() else {
        return false;
    };
    let first = first.to_lowercase();
    FOOTER_KEYWORDS.iter().any(|kw| first.contains(kw))
}
