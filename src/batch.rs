//! Parallel ingestion across a set of report files.
//!
//! One independent work unit per file on a bounded rayon pool. Identifiers
//! are deduplicated up front (completion order is not deterministic, so
//! doing it during aggregation would race); the only state shared between
//! work units is the aggregate behind a mutex. Sorting and totals run once
//! after the pool drains.

use crate::ingest;
use crate::models::{Diagnostic, ResultAggregate};
use glob::PatternError;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::SystemTime;
use thiserror::Error;

/// Observer for batch progress. Implementations must tolerate concurrent
/// calls from worker threads.
pub trait IngestListener: Sync {
    /// A file is about to be parsed.
    fn parsing(&self, _path: &Path) {}
    /// A per-file problem was recorded; the batch continues.
    fn diagnostic(&self, _diagnostic: &Diagnostic) {}
}

/// Listener that swallows everything.
pub struct SilentListener;

impl IngestListener for SilentListener {}

/// Batch tuning knobs, already resolved from config/environment.
pub struct BatchOptions {
    /// Requested worker count; clamped to available parallelism.
    pub threads: usize,
    /// Files modified before this instant are skipped.
    pub freshness_baseline: Option<SystemTime>,
    /// Disables the freshness filter entirely.
    pub ignore_freshness: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            threads: crate::config::DEFAULT_THREADS,
            freshness_baseline: None,
            ignore_freshness: false,
        }
    }
}

/// Unexpected orchestration failure. Per-file problems never surface
/// here; this is reserved for the worker pool itself being unusable.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Expand glob patterns relative to `root` into a sorted, deduplicated
/// file list.
pub fn collect_report_files(
    root: &Path,
    patterns: &[String],
) -> Result<Vec<PathBuf>, PatternError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let absolute = root.join(pattern);
        for entry in glob::glob(&absolute.to_string_lossy())? {
            if let Ok(path) = entry {
                if path.is_file() {
                    files.push(path);
                }
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Parse all files on a bounded worker pool and aggregate the results.
///
/// Blocks until every work unit has finished; rayon's structured join is
/// the wait-for-drain. Per-file failures are isolated into diagnostics.
pub fn run_batch(
    paths: &[PathBuf],
    options: &BatchOptions,
    listener: &dyn IngestListener,
) -> Result<(ResultAggregate, Vec<Diagnostic>), BatchError> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let fresh = apply_freshness_filter(paths, options, &mut diagnostics);
    let work = assign_identifiers(&fresh);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(effective_threads(options.threads))
        .build()?;

    let aggregate = Mutex::new(ResultAggregate::new());
    let shared_diagnostics = Mutex::new(Vec::new());
    pool.install(|| {
        work.par_iter().for_each(|(path, identifier)| {
            listener.parsing(path);
            let outcome = ingest::ingest_file(path, identifier.clone());
            for diagnostic in &outcome.diagnostics {
                listener.diagnostic(diagnostic);
            }
            aggregate.lock().unwrap().push_unsorted(outcome.record);
            shared_diagnostics
                .lock()
                .unwrap()
                .extend(outcome.diagnostics);
        });
    });

    let mut aggregate = aggregate.into_inner().unwrap();
    aggregate.finalize();

    diagnostics.extend(shared_diagnostics.into_inner().unwrap());
    // Deterministic ordering regardless of completion order.
    diagnostics.sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.message.cmp(&b.message)));
    Ok((aggregate, diagnostics))
}

/// Requested thread count clamped to the hardware, with a floor of one.
fn effective_threads(requested: usize) -> usize {
    let hardware = thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    requested.max(1).min(hardware)
}

/// Drop files older than the baseline unless the filter is bypassed.
fn apply_freshness_filter(
    paths: &[PathBuf],
    options: &BatchOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<PathBuf> {
    let baseline = match options.freshness_baseline {
        Some(baseline) if !options.ignore_freshness => baseline,
        _ => return paths.to_vec(),
    };
    paths
        .iter()
        .filter(|path| {
            let fresh = path
                .metadata()
                .and_then(|m| m.modified())
                .map(|modified| modified >= baseline)
                // Unreadable metadata is not this filter's problem; let
                // ingestion report it.
                .unwrap_or(true);
            if !fresh {
                diagnostics.push(Diagnostic::new(
                    path.to_string_lossy(),
                    "skipped: file is older than the run baseline (use --ignore-freshness to force)",
                ));
            }
            fresh
        })
        .cloned()
        .collect()
}

/// Assign each file a batch-unique display identifier, in input order.
///
/// The identifier is the base file name; collisions get `_1`, `_2`, …
/// suffixes. This runs before dispatch so the assignment does not depend
/// on completion order.
fn assign_identifiers(paths: &[PathBuf]) -> Vec<(PathBuf, String)> {
    let mut taken: HashSet<String> = HashSet::new();
    paths
        .iter()
        .map(|path| {
            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());
            let mut candidate = base.clone();
            let mut suffix = 0usize;
            while !taken.insert(candidate.clone()) {
                suffix += 1;
                candidate = format!("{}_{}", base, suffix);
            }
            (path.clone(), candidate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    const XML_REPORT: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <integrity><suite>\
        <result successCount=\"3\" failureCount=\"1\" testExceptionCount=\"0\" callExceptionCount=\"0\"/>\
        </suite></integrity>";

    const HTML_REPORT: &[u8] = b"<!DOCTYPE html>\n<html><body>\
        <xmldata version=\"1.0\"><integrity name=\"T2\">\
        <suite><suite><result type=\"call\"/></suite>\
        <result successCount=\"5\" failureCount=\"0\" testExceptionCount=\"1\" callExceptionCount=\"0\"/>\
        </suite></integrity></xmldata></body></html>";

    #[test]
    fn test_two_file_batch_totals_and_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.xml"), XML_REPORT).unwrap();
        fs::write(dir.path().join("b.html"), HTML_REPORT).unwrap();
        let files =
            collect_report_files(dir.path(), &["*.xml".to_string(), "*.html".to_string()])
                .unwrap();
        assert_eq!(files.len(), 2);

        let (aggregate, diagnostics) =
            run_batch(&files, &BatchOptions::default(), &SilentListener).unwrap();
        assert!(diagnostics.is_empty(), "diagnostics: {:?}", diagnostics);
        assert_eq!(aggregate.len(), 2);
        assert_eq!(aggregate.totals().success_count, 8);
        assert_eq!(aggregate.totals().failure_count, 1);
        assert_eq!(aggregate.totals().test_exception_count, 1);
        assert_eq!(aggregate.totals().call_exception_count, 0);
        // Unnamed before "T2" under the empty-string convention.
        assert_eq!(aggregate.children()[0].display_name(), "");
        assert_eq!(aggregate.children()[1].display_name(), "T2");
    }

    #[test]
    fn test_duplicate_base_names_deduplicated_in_order() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("one")).unwrap();
        fs::create_dir(dir.path().join("two")).unwrap();
        let first = dir.path().join("one/report.html");
        let second = dir.path().join("two/report.html");
        fs::write(&first, HTML_REPORT).unwrap();
        fs::write(&second, HTML_REPORT).unwrap();

        let assigned = assign_identifiers(&[first, second]);
        assert_eq!(assigned[0].1, "report.html");
        assert_eq!(assigned[1].1, "report.html_1");
    }

    #[test]
    fn test_dedup_survives_a_third_collision() {
        let paths = vec![
            PathBuf::from("x/r.html"),
            PathBuf::from("y/r.html"),
            PathBuf::from("z/r.html"),
        ];
        let assigned = assign_identifiers(&paths);
        let ids: Vec<&str> = assigned.iter().map(|(_, id)| id.as_str()).collect();
        assert_eq!(ids, vec!["r.html", "r.html_1", "r.html_2"]);
    }

    #[test]
    fn test_malformed_and_empty_files_do_not_abort_batch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("good.xml"), XML_REPORT).unwrap();
        fs::write(dir.path().join("empty.html"), b"").unwrap();
        fs::write(dir.path().join("broken.html"), b"<html><xmldata version=\"1\"><integrity><suite><result successCount=").unwrap();
        let files = collect_report_files(dir.path(), &["*".to_string()]).unwrap();
        assert_eq!(files.len(), 3);

        let (aggregate, diagnostics) =
            run_batch(&files, &BatchOptions::default(), &SilentListener).unwrap();
        assert_eq!(aggregate.len(), 3);
        assert_eq!(aggregate.totals().success_count, 3);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].file.contains("broken.html"));
    }

    #[test]
    fn test_freshness_filter_skips_and_bypasses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.xml");
        fs::write(&path, XML_REPORT).unwrap();
        let files = vec![path];

        let future = SystemTime::now() + Duration::from_secs(3600);
        let options = BatchOptions {
            freshness_baseline: Some(future),
            ..BatchOptions::default()
        };
        let (aggregate, diagnostics) = run_batch(&files, &options, &SilentListener).unwrap();
        assert!(aggregate.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("older than the run baseline"));

        let options = BatchOptions {
            freshness_baseline: Some(future),
            ignore_freshness: true,
            ..BatchOptions::default()
        };
        let (aggregate, diagnostics) = run_batch(&files, &options, &SilentListener).unwrap();
        assert_eq!(aggregate.len(), 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_effective_threads_clamped() {
        assert_eq!(effective_threads(0), 1);
        assert!(effective_threads(usize::MAX) <= thread::available_parallelism().unwrap().get());
        assert!(effective_threads(1) >= 1);
    }

    #[test]
    fn test_listener_sees_progress_and_diagnostics() {
        struct Collecting {
            parsed: Mutex<Vec<PathBuf>>,
            problems: Mutex<Vec<Diagnostic>>,
        }
        impl IngestListener for Collecting {
            fn parsing(&self, path: &Path) {
                self.parsed.lock().unwrap().push(path.to_path_buf());
            }
            fn diagnostic(&self, diagnostic: &Diagnostic) {
                self.problems.lock().unwrap().push(diagnostic.clone());
            }
        }

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.xml"), XML_REPORT).unwrap();
        let files = collect_report_files(dir.path(), &["*.xml".to_string()]).unwrap();
        let listener = Collecting {
            parsed: Mutex::new(Vec::new()),
            problems: Mutex::new(Vec::new()),
        };
        run_batch(&files, &BatchOptions::default(), &listener).unwrap();
        assert_eq!(listener.parsed.lock().unwrap().len(), 1);
        assert!(listener.problems.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_batch_yields_empty_aggregate() {
        let (aggregate, diagnostics) =
            run_batch(&[], &BatchOptions::default(), &SilentListener).unwrap();
        assert!(aggregate.is_empty());
        assert!(diagnostics.is_empty());
        assert_eq!(aggregate.totals().success_count, 0);
    }
}
