//! Extraction of localized text records from an HTML table.
//!
//! The expected table shape is fixed: the second row is the locale header
//! (its first two cells are reserved for non-locale columns), and every row
//! after it is a data row whose first cell holds the record key. A header
//! cell either names its locale in parentheses (`"English (en)"` → `en`) or
//! is the bare locale code itself (`"fr"` → `fr`).
//!
//! Parsing is intentionally lenient: input is typically exported HTML, not
//! well-formed XML, so end-tag name checking is disabled and unknown
//! entities fall back to their raw text.

use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

/// Failure to read the table structure out of the markup.
#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("markup could not be parsed: {0}")]
    Markup(#[from] quick_xml::Error),
    #[error("no locale header row found (the table needs at least two rows)")]
    MissingLocaleHeader,
}

/// One table row: a key plus its text in every known locale.
///
/// `texts` always carries an entry for every locale listed in the owning
/// [`ExtractionResult`]; cells missing from a short source row are recorded
/// as empty strings so downstream skip logic can tell "no text" apart from
/// "no column".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    pub key: String,
    pub texts: HashMap<String, String>,
}

/// The locale header and data rows of one source document, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Locale codes in order of first appearance in the header row.
    pub locales: Vec<String>,
    /// Data records in row order.
    pub records: Vec<TextRecord>,
}

/// Extract the locale list and text records from raw HTML markup.
///
/// Fails with [`TableError::MissingLocaleHeader`] when the document holds
/// fewer than two table rows. A table with a header row but no data rows is
/// valid and yields an empty record list.
pub fn extract(markup: &[u8]) -> Result<ExtractionResult, TableError> {
    let html = String::from_utf8_lossy(markup);
    let rows = collect_rows(&html)?;

    if rows.len() < 2 {
        return Err(TableError::MissingLocaleHeader);
    }

    // Second row is the locale header; its first two cells are reserved.
    let locales: Vec<String> = rows[1]
        .iter()
        .skip(2)
        .map(|cell| locale_code(cell))
        .collect();

    let mut records = Vec::new();
    for row in &rows[2..] {
        let key = match row.first() {
            Some(cell) => cell.trim(),
            None => continue,
        };
        if key.is_empty() {
            continue;
        }

        let mut texts = HashMap::with_capacity(locales.len());
        for (i, locale) in locales.iter().enumerate() {
            // Locale column i lives at cell i + 2; short rows default to "".
            let text = row.get(i + 2).map(|cell| cell.trim()).unwrap_or("");
            texts.insert(locale.clone(), text.to_string());
        }

        records.push(TextRecord {
            key: key.to_string(),
            texts,
        });
    }

    log::info!(
        "extracted {} records across locales {:?}",
        records.len(),
        locales
    );

    Ok(ExtractionResult { locales, records })
}

/// Pull the locale code out of a header cell.
///
/// `"English (en)"` yields `"en"`; a cell without a parenthesized code
/// yields its full trimmed text.
fn locale_code(cell: &str) -> String {
    let text = cell.trim();
    if let (Some(start), Some(end)) = (text.find('('), text.find(')')) {
        if start < end {
            return text[start + 1..end].to_string();
        }
    }
    text.to_string()
}

/// Walk the markup events and collect every `<tr>` as a list of cell texts.
fn collect_rows(html: &str) -> Result<Vec<Vec<String>>, TableError> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match lowercase_name(e.name().as_ref()).as_slice() {
                b"tr" => {
                    flush_cell(&mut row, &mut cell);
                    flush_row(&mut rows, &mut row);
                    row = Some(Vec::new());
                }
                // An opening cell tag while a cell is still open means the
                // previous cell was never closed; finish it first.
                b"td" | b"th" => {
                    flush_cell(&mut row, &mut cell);
                    if row.is_some() {
                        cell = Some(String::new());
                    }
                }
                _ => {}
            },
            // A self-closed cell is a present-but-empty cell.
            Event::Empty(e) => {
                if matches!(
                    lowercase_name(e.name().as_ref()).as_slice(),
                    b"td" | b"th"
                ) {
                    flush_cell(&mut row, &mut cell);
                    if let Some(row) = row.as_mut() {
                        row.push(String::new());
                    }
                }
            }
            Event::End(e) => match lowercase_name(e.name().as_ref()).as_slice() {
                b"td" | b"th" => flush_cell(&mut row, &mut cell),
                b"tr" | b"table" => {
                    flush_cell(&mut row, &mut cell);
                    flush_row(&mut rows, &mut row);
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some(cell) = cell.as_mut() {
                    let piece = t
                        .unescape()
                        .map(Cow::into_owned)
                        .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()).into_owned());
                    cell.push_str(&piece);
                }
            }
            Event::CData(t) => {
                if let Some(cell) = cell.as_mut() {
                    cell.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Tolerate markup that ends without closing the last row.
    flush_cell(&mut row, &mut cell);
    flush_row(&mut rows, &mut row);

    Ok(rows)
}

fn lowercase_name(name: &[u8]) -> Vec<u8> {
    name.to_ascii_lowercase()
}

fn flush_cell(row: &mut Option<Vec<String>>, cell: &mut Option<String>) {
    if let (Some(row), Some(text)) = (row.as_mut(), cell.take()) {
        row.push(text);
    }
}

fn flush_row(rows: &mut Vec<Vec<String>>, row: &mut Option<Vec<String>>) {
    if let Some(cells) = row.take() {
        rows.push(cells);
    }
}
