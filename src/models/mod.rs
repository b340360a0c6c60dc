//! Shared data models: per-file records, diagnostics, and the aggregate.

pub mod aggregate;

pub use aggregate::{Found, ResultAggregate, RunStatus};

use crate::summary::SummaryCounts;
use serde::Serialize;

/// MIME type reported for files sniffed as plain XML.
pub const XML_CONTENT_TYPE: &str = "text/xml;charset=UTF-8";

/// MIME type reported for HTML-wrapped files.
pub const HTML_CONTENT_TYPE: &str = "text/html;charset=UTF-8";

/// The parse outcome of one result file.
///
/// Immutable once constructed; owned by the [`ResultAggregate`] for the
/// rest of its life. The original file bytes are retained verbatim for
/// archival no matter how the parse went.
pub struct ReportRecord {
    /// Batch-unique identifier derived from the file name.
    pub identifier: String,
    /// Run name captured from the report, if any.
    pub test_name: Option<String>,
    /// `text/xml;charset=UTF-8` or `text/html;charset=UTF-8`.
    pub content_type: &'static str,
    /// The unmodified file content.
    pub raw: Vec<u8>,
    pub counts: SummaryCounts,
}

impl ReportRecord {
    /// Name used for display and ordering; records without a run name sort
    /// under the empty string.
    pub fn display_name(&self) -> &str {
        self.test_name.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A per-file problem report. Diagnostics never abort the batch.
pub struct Diagnostic {
    pub file: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            file: file.into(),
            message: message.into(),
        }
    }
}
