//! Summary extraction from the stream of parse events.
//!
//! A result file carries exactly one outer summary `result` element holding
//! the aggregate counts of the whole run; per-call results are also named
//! `result` but always carry a `type` attribute and sit at other depths.
//! The extractor watches events until the outer summary is seen, then asks
//! the driving loop to stop pulling.

use crate::xmlstream::{Attributes, XmlEvent};
use serde::Serialize;

/// Aggregate pass/fail/exception counts of one test run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    #[serde(rename = "successCount")]
    pub success_count: u32,
    #[serde(rename = "failureCount")]
    pub failure_count: u32,
    #[serde(rename = "testExceptionCount")]
    pub test_exception_count: u32,
    #[serde(rename = "callExceptionCount")]
    pub call_exception_count: u32,
}

impl SummaryCounts {
    /// Field-wise sum.
    pub fn add(&mut self, other: &SummaryCounts) {
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
        self.test_exception_count += other.test_exception_count;
        self.call_exception_count += other.call_exception_count;
    }
}

/// Event consumer that captures the run name and the outer summary counts.
///
/// `on_event` returns `false` once the summary has been captured; the
/// caller stops pulling events at that point. A document without a
/// qualifying summary element leaves the counts at zero, which is a valid
/// (empty) result rather than an error.
pub struct SummaryExtractor {
    suite_depth: usize,
    inside_stylesheet: bool,
    satisfied: bool,
    test_name: Option<String>,
    counts: SummaryCounts,
}

impl Default for SummaryExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryExtractor {
    pub fn new() -> Self {
        SummaryExtractor {
            suite_depth: 0,
            inside_stylesheet: false,
            satisfied: false,
            test_name: None,
            counts: SummaryCounts::default(),
        }
    }

    /// Feed one event. Returns `true` to keep parsing, `false` once done.
    pub fn on_event(&mut self, event: &XmlEvent) -> bool {
        match event {
            XmlEvent::Start { name, attributes } => {
                if self.inside_stylesheet {
                    return true;
                }
                match name.as_str() {
                    // The island embeds the presentation transform; its
                    // suite/result templates must not be mistaken for data.
                    "xsl:stylesheet" => self.inside_stylesheet = true,
                    "suite" => self.suite_depth += 1,
                    "integrity" => {
                        self.test_name = attributes.get("name").map(str::to_owned);
                    }
                    "result" => {
                        if self.suite_depth == 1 && attributes.get("type").is_none() {
                            self.counts = read_counts(attributes);
                            self.satisfied = true;
                            return false;
                        }
                    }
                    _ => {}
                }
            }
            XmlEvent::End { name } => {
                if self.inside_stylesheet {
                    if name == "xsl:stylesheet" {
                        self.inside_stylesheet = false;
                    }
                } else if name == "suite" {
                    self.suite_depth = self.suite_depth.saturating_sub(1);
                }
            }
        }
        true
    }

    /// Whether the outer summary element was seen.
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Consume the extractor, yielding the captured run name and counts.
    pub fn finish(self) -> (Option<String>, SummaryCounts) {
        (self.test_name, self.counts)
    }
}

/// Count attributes are matched case-insensitively; each one defaults to 0
/// on absence or an unparseable value.
fn read_counts(attributes: &Attributes) -> SummaryCounts {
    SummaryCounts {
        success_count: read_count(attributes, "successCount"),
        failure_count: read_count(attributes, "failureCount"),
        test_exception_count: read_count(attributes, "testExceptionCount"),
        call_exception_count: read_count(attributes, "callExceptionCount"),
    }
}

fn read_count(attributes: &Attributes, name: &str) -> u32 {
    attributes
        .get_ignore_case(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlstream::XmlReader;
    use std::io::Cursor;

    /// Drive a document through the extractor the way the ingestor does,
    /// returning the extractor plus the number of events consumed.
    fn run(doc: &[u8]) -> (SummaryExtractor, usize) {
        let mut reader = XmlReader::new(Cursor::new(doc));
        let mut extractor = SummaryExtractor::new();
        let mut consumed = 0;
        while let Some(ev) = reader.next_event().unwrap() {
            consumed += 1;
            if !extractor.on_event(&ev) {
                break;
            }
        }
        (extractor, consumed)
    }

    #[test]
    fn test_outer_summary_captured_and_parse_stops() {
        let doc = b"<integrity name=\"run\">\
                      <suite>\
                        <suite><result type=\"call\"/></suite>\
                        <result successCount=\"7\" failureCount=\"2\" \
                                testExceptionCount=\"1\" callExceptionCount=\"3\"/>\
                        <suite><result type=\"test\"/></suite>\
                      </suite>\
                    </integrity>";
        let (extractor, consumed) = run(doc);
        assert!(extractor.is_satisfied());
        let (name, counts) = extractor.finish();
        assert_eq!(name.as_deref(), Some("run"));
        assert_eq!(
            counts,
            SummaryCounts {
                success_count: 7,
                failure_count: 2,
                test_exception_count: 1,
                call_exception_count: 3,
            }
        );
        // integrity, suite, suite, result(call) + its end, end of the
        // inner suite, then the summary result. The trailing sibling
        // suite is never pulled.
        assert_eq!(consumed, 7);
    }

    #[test]
    fn test_typed_result_at_depth_one_is_skipped() {
        let doc = b"<integrity><suite><result type=\"call\" successCount=\"9\"/></suite></integrity>";
        let (extractor, _) = run(doc);
        assert!(!extractor.is_satisfied());
        assert_eq!(extractor.finish().1, SummaryCounts::default());
    }

    #[test]
    fn test_result_outside_suite_is_skipped() {
        let doc = b"<integrity><result successCount=\"9\"/></integrity>";
        let (extractor, _) = run(doc);
        assert!(!extractor.is_satisfied());
    }

    #[test]
    fn test_stylesheet_subtree_ignored_entirely() {
        let doc = b"<integrity>\
                      <xsl:stylesheet>\
                        <suite><result successCount=\"99\"/></suite>\
                      </xsl:stylesheet>\
                      <suite><result successCount=\"4\"/></suite>\
                    </integrity>";
        let (extractor, _) = run(doc);
        assert!(extractor.is_satisfied());
        assert_eq!(extractor.finish().1.success_count, 4);
    }

    #[test]
    fn test_count_attributes_matched_case_insensitively() {
        let doc = b"<integrity><suite><result SUCCESSCOUNT=\"3\" FailureCount=\"1\"/></suite></integrity>";
        let (extractor, _) = run(doc);
        let (_, counts) = extractor.finish();
        assert_eq!(counts.success_count, 3);
        assert_eq!(counts.failure_count, 1);
        assert_eq!(counts.test_exception_count, 0);
    }

    #[test]
    fn test_each_count_guarded_by_its_own_presence() {
        // callExceptionCount must be read even when testExceptionCount is
        // absent.
        let doc = b"<integrity><suite><result callExceptionCount=\"5\"/></suite></integrity>";
        let (extractor, _) = run(doc);
        let (_, counts) = extractor.finish();
        assert_eq!(counts.call_exception_count, 5);
        assert_eq!(counts.test_exception_count, 0);
    }

    #[test]
    fn test_unparseable_count_defaults_to_zero() {
        let doc = b"<integrity><suite><result successCount=\"lots\"/></suite></integrity>";
        let (extractor, _) = run(doc);
        assert_eq!(extractor.finish().1.success_count, 0);
    }

    #[test]
    fn test_document_without_summary_yields_empty_result() {
        let (extractor, _) = run(b"<integrity name=\"n\"><suite></suite></integrity>");
        assert!(!extractor.is_satisfied());
        let (name, counts) = extractor.finish();
        assert_eq!(name.as_deref(), Some("n"));
        assert_eq!(counts, SummaryCounts::default());
    }

    #[test]
    fn test_early_stop_never_touches_garbage_tail() {
        // Everything after the summary element may be arbitrarily broken.
        let doc = b"<integrity><suite><result successCount=\"1\"/></suite></integrity><<<broken";
        let (extractor, _) = run(doc);
        assert!(extractor.is_satisfied());
        assert_eq!(extractor.finish().1.success_count, 1);
    }
}
