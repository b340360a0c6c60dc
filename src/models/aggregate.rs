//! The result tree: per-file records plus derived totals.

use crate::models::ReportRecord;
use crate::summary::SummaryCounts;

/// Overall outcome of an aggregate, in order of decreasing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Failure,
    Exception,
    Success,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Failure => "failure",
            RunStatus::Exception => "exception",
            RunStatus::Success => "success",
        }
    }
}

/// Outcome of an identifier lookup.
pub enum Found<'a> {
    Aggregate(&'a ResultAggregate),
    Record(&'a ReportRecord),
}

/// Ordered collection of report records with derived totals.
///
/// Children are kept sorted by run name (case-insensitive, empty string
/// for unnamed records). Totals are derived data: they must be refreshed
/// with [`recompute_totals`](Self::recompute_totals) after any structural
/// change before being read.
pub struct ResultAggregate {
    identifier: String,
    children: Vec<ReportRecord>,
    totals: SummaryCounts,
}

impl Default for ResultAggregate {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregate {
    pub fn new() -> Self {
        Self::named(String::new())
    }

    /// An aggregate with its own identifier, used to resolve hierarchical
    /// lookups of the form `aggregate-id/record-id`.
    pub fn named(identifier: impl Into<String>) -> Self {
        ResultAggregate {
            identifier: identifier.into(),
            children: Vec::new(),
            totals: SummaryCounts::default(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn children(&self) -> &[ReportRecord] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Append one record, keeping the children sorted. Incremental callers
    /// pay a sort per insert; batch insertion goes through
    /// [`push_unsorted`](Self::push_unsorted) + [`finalize`](Self::finalize)
    /// instead.
    pub fn add_child(&mut self, record: ReportRecord) {
        self.children.push(record);
        self.sort_children();
    }

    /// Append without sorting. The caller owns a later `finalize` call.
    pub(crate) fn push_unsorted(&mut self, record: ReportRecord) {
        self.children.push(record);
    }

    /// One sort plus one totals pass, run after a batch of unsorted
    /// appends.
    pub(crate) fn finalize(&mut self) {
        self.sort_children();
        self.recompute_totals();
    }

    fn sort_children(&mut self) {
        self.children
            .sort_by(|a, b| ordering_key(a).cmp(&ordering_key(b)));
    }

    /// Re-derive the four count totals from the children.
    pub fn recompute_totals(&mut self) {
        let mut totals = SummaryCounts::default();
        for child in &self.children {
            totals.add(&child.counts);
        }
        self.totals = totals;
    }

    pub fn totals(&self) -> &SummaryCounts {
        &self.totals
    }

    /// Resolve an identifier to this aggregate or one of its records.
    ///
    /// The query may be the bare record identifier or hierarchically
    /// prefixed with this aggregate's own identifier. Absence is a normal
    /// outcome, not an error.
    pub fn find(&self, id: &str) -> Option<Found<'_>> {
        if id == self.identifier {
            return Some(Found::Aggregate(self));
        }
        let bare = if self.identifier.is_empty() {
            id
        } else {
            id.strip_prefix(self.identifier.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(id)
        };
        self.children
            .iter()
            .find(|c| c.identifier == bare)
            .map(Found::Record)
    }

    /// Successes plus failures; exceptions are counted separately.
    pub fn total_count(&self) -> u32 {
        self.totals.success_count + self.totals.failure_count
    }

    pub fn exception_count(&self) -> u32 {
        self.totals.test_exception_count + self.totals.call_exception_count
    }

    /// Percentage of non-failed tests, 100 for an empty run.
    pub fn health_score(&self) -> u32 {
        let total = self.total_count();
        if total == 0 {
            return 100;
        }
        (100.0 * (1.0 - f64::from(self.totals.failure_count) / f64::from(total))) as u32
    }

    pub fn status(&self) -> RunStatus {
        if self.totals.failure_count > 0 {
            RunStatus::Failure
        } else if self.exception_count() > 0 {
            RunStatus::Exception
        } else {
            RunStatus::Success
        }
    }
}

fn ordering_key(record: &ReportRecord) -> String {
    record.display_name().to_lowercase()
}
