//! Per-file report ingestion.
//!
//! Turns one result file into one [`ReportRecord`]: sniff the content
//! kind, locate the embedded XML island when the file is HTML-wrapped,
//! assemble the logical parse stream, and drive the streaming parser
//! against the summary extractor. Parsing is best effort: a file that
//! cannot be read or parsed still yields a record (with zero counts) plus
//! a diagnostic, never a batch failure.

use crate::filter::BracketFilter;
use crate::models::{Diagnostic, ReportRecord, HTML_CONTENT_TYPE, XML_CONTENT_TYPE};
use crate::summary::SummaryExtractor;
use crate::xmlstream::XmlReader;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

/// What a result file claims to be, decided by sniffing its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Xml,
    Html,
}

impl ContentKind {
    /// Files of 10 bytes or fewer are too short to sniff and are treated
    /// as HTML (they will simply parse to an empty result).
    pub fn sniff(buffer: &[u8]) -> ContentKind {
        if buffer.len() > 10 && buffer.starts_with(b"<?xml") {
            ContentKind::Xml
        } else {
            ContentKind::Html
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ContentKind::Xml => XML_CONTENT_TYPE,
            ContentKind::Html => HTML_CONTENT_TYPE,
        }
    }
}

/// Byte ranges of an HTML buffer that form the parser-ready logical
/// stream: `[0, doctype_end)` + `[xml_start, end)`. Computed once per
/// file, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParseWindow {
    doctype_end: usize,
    xml_start: usize,
}

/// Find the doctype preamble and the start of the `<xmldata ` island.
///
/// The doctype prefix is matched literally and ends one byte past its
/// closing `>`. The island scan starts at the doctype end (the island
/// cannot precede it) and gives up 10 bytes short of the buffer end, so a
/// buffer without an island yields a window whose tail parses to nothing.
fn locate_window(buffer: &[u8]) -> ParseWindow {
    let doctype_end = if buffer.starts_with(b"<!DOCTYPE ") {
        buffer
            .iter()
            .position(|&b| b == b'>')
            .map(|p| p + 1)
            .unwrap_or(buffer.len())
    } else {
        0
    };

    let mut xml_start = doctype_end;
    let limit = buffer.len().saturating_sub(10);
    while xml_start < limit && !buffer[xml_start..].starts_with(b"<xmldata ") {
        xml_start += 1;
    }
    ParseWindow {
        doctype_end,
        xml_start,
    }
}

/// The record plus any per-file diagnostics produced along the way.
pub struct FileOutcome {
    pub record: ReportRecord,
    pub diagnostics: Vec<Diagnostic>,
}

/// Read and parse one result file under the given batch identifier.
pub fn ingest_file(path: &Path, identifier: String) -> FileOutcome {
    let mut diagnostics = Vec::new();
    let raw = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                path.to_string_lossy(),
                format!("failed to read file: {}", e),
            ));
            Vec::new()
        }
    };
    let record = ingest_buffer(raw, identifier, &path.to_string_lossy(), &mut diagnostics);
    FileOutcome {
        record,
        diagnostics,
    }
}

/// Parse an in-memory buffer into a record. `origin` only labels
/// diagnostics.
pub fn ingest_buffer(
    raw: Vec<u8>,
    identifier: String,
    origin: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> ReportRecord {
    let kind = ContentKind::sniff(&raw);
    let mut extractor = SummaryExtractor::new();

    {
        // The logical stream borrows the raw buffer; the borrow ends
        // before the buffer moves into the record.
        let stream: Box<dyn Read + '_> = match kind {
            ContentKind::Xml => Box::new(Cursor::new(&raw[..])),
            ContentKind::Html => {
                let window = locate_window(&raw);
                let island: Box<dyn Read + '_> =
                    if window.doctype_end > 0 && window.xml_start < raw.len() {
                        // Splice the doctype declaration directly onto the
                        // island, dropping the markup in between that a
                        // strict parser would reject.
                        Box::new(
                            Cursor::new(&raw[..window.doctype_end])
                                .chain(Cursor::new(&raw[window.xml_start..])),
                        )
                    } else {
                        Box::new(Cursor::new(&raw[window.xml_start..]))
                    };
                Box::new(BracketFilter::new(island))
            }
        };

        let mut reader = XmlReader::new(stream);
        loop {
            match reader.next_event() {
                Ok(Some(event)) => {
                    if !extractor.on_event(&event) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    diagnostics.push(Diagnostic::new(
                        origin,
                        format!("gave up parsing: {}", e),
                    ));
                    break;
                }
            }
        }
    }

    let (test_name, counts) = extractor.finish();
    ReportRecord {
        identifier,
        test_name,
        content_type: kind.content_type(),
        raw,
        counts,
    }
}
