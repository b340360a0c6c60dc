//! Output rendering for the ingest command.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes
//! per-file entries, the diagnostics, and a top-level summary.

use crate::models::{Diagnostic, ReportRecord, ResultAggregate, RunStatus};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// Print the aggregate in the requested format.
pub fn print_ingest(aggregate: &ResultAggregate, diagnostics: &[Diagnostic], output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_ingest_json(aggregate, diagnostics)).unwrap()
        ),
        _ => {
            let color = use_colors(output);
            for diagnostic in diagnostics {
                if color {
                    println!(
                        "{} {} — {}",
                        "▲".yellow(),
                        diagnostic.file.bold(),
                        diagnostic.message
                    );
                } else {
                    println!("▲ {} — {}", diagnostic.file, diagnostic.message);
                }
            }
            for record in aggregate.children() {
                print_record(record, color);
            }
            let summary = format!(
                "— Summary — tests={} success={} failures={} exceptions={} health={}% files={}",
                aggregate.total_count(),
                aggregate.totals().success_count,
                aggregate.totals().failure_count,
                aggregate.exception_count(),
                aggregate.health_score(),
                aggregate.len()
            );
            if color {
                match aggregate.status() {
                    RunStatus::Failure => println!("{}", summary.red().bold()),
                    RunStatus::Exception => println!("{}", summary.yellow().bold()),
                    RunStatus::Success => println!("{}", summary.bold()),
                }
            } else {
                println!("{}", summary);
            }
        }
    }
}

fn print_record(record: &ReportRecord, color: bool) {
    let failed = record.counts.failure_count > 0;
    let excepted =
        record.counts.test_exception_count > 0 || record.counts.call_exception_count > 0;
    let icon = if failed {
        if color {
            "✖".red().to_string()
        } else {
            "✖".to_string()
        }
    } else if excepted {
        if color {
            "▲".yellow().to_string()
        } else {
            "▲".to_string()
        }
    } else if color {
        "✔".green().to_string()
    } else {
        "✔".to_string()
    };
    let name = if record.display_name().is_empty() {
        "(unnamed)".to_string()
    } else {
        record.display_name().to_string()
    };
    let name = if color { name.bold().to_string() } else { name };
    println!(
        "{} {} ❲{}❳ success={} failures={} exceptions={}/{}",
        icon,
        name,
        record.identifier,
        record.counts.success_count,
        record.counts.failure_count,
        record.counts.test_exception_count,
        record.counts.call_exception_count,
    );
}

/// Compose the ingest JSON object (pure) for testing/snapshot purposes.
///
/// Raw report bytes are not embedded, only their length.
pub fn compose_ingest_json(aggregate: &ResultAggregate, diagnostics: &[Diagnostic]) -> JsonVal {
    let results: Vec<_> = aggregate
        .children()
        .iter()
        .map(|r| {
            json!({
                "identifier": r.identifier,
                "testName": r.test_name,
                "contentType": r.content_type,
                "bytes": r.raw.len(),
                "counts": r.counts,
            })
        })
        .collect();
    let summary = json!({
        "counts": aggregate.totals(),
        "tests": aggregate.total_count(),
        "exceptions": aggregate.exception_count(),
        "health": aggregate.health_score(),
        "status": aggregate.status().as_str(),
        "files": aggregate.len(),
    });
    json!({
        "results": results,
        "diagnostics": diagnostics,
        "summary": summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportRecord, HTML_CONTENT_TYPE, XML_CONTENT_TYPE};
    use crate::summary::SummaryCounts;

    fn sample_aggregate() -> ResultAggregate {
        let mut aggregate = ResultAggregate::new();
        aggregate.add_child(ReportRecord {
            identifier: "a.xml".into(),
            test_name: None,
            content_type: XML_CONTENT_TYPE,
            raw: b"<?xml?>".to_vec(),
            counts: SummaryCounts {
                success_count: 3,
                failure_count: 1,
                test_exception_count: 0,
                call_exception_count: 0,
            },
        });
        aggregate.add_child(ReportRecord {
            identifier: "b.html".into(),
            test_name: Some("T2".into()),
            content_type: HTML_CONTENT_TYPE,
            raw: b"<html>".to_vec(),
            counts: SummaryCounts {
                success_count: 5,
                failure_count: 0,
                test_exception_count: 1,
                call_exception_count: 0,
            },
        });
        aggregate.recompute_totals();
        aggregate
    }

    #[test]
    fn test_compose_ingest_json_shape() {
        let aggregate = sample_aggregate();
        let diagnostics = vec![Diagnostic::new("c.html", "gave up parsing: oops")];
        let out = compose_ingest_json(&aggregate, &diagnostics);

        assert_eq!(out["results"][0]["identifier"], "a.xml");
        assert_eq!(out["results"][0]["testName"], JsonVal::Null);
        assert_eq!(out["results"][0]["contentType"], "text/xml;charset=UTF-8");
        assert_eq!(out["results"][0]["bytes"], 7);
        assert_eq!(out["results"][0]["counts"]["successCount"], 3);
        assert_eq!(out["results"][1]["testName"], "T2");

        assert_eq!(out["summary"]["counts"]["successCount"], 8);
        assert_eq!(out["summary"]["counts"]["failureCount"], 1);
        assert_eq!(out["summary"]["tests"], 9);
        assert_eq!(out["summary"]["exceptions"], 1);
        assert_eq!(out["summary"]["status"], "failure");
        assert_eq!(out["summary"]["files"], 2);

        assert_eq!(out["diagnostics"][0]["file"], "c.html");
    }

    #[test]
    fn test_compose_ingest_json_empty() {
        let mut aggregate = ResultAggregate::new();
        aggregate.recompute_totals();
        let out = compose_ingest_json(&aggregate, &[]);
        assert_eq!(out["results"].as_array().unwrap().len(), 0);
        assert_eq!(out["summary"]["tests"], 0);
        assert_eq!(out["summary"]["health"], 100);
        assert_eq!(out["summary"]["status"], "success");
    }
}
