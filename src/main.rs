//! Intrep CLI binary entry point.
//! Delegates to library modules for ingestion and prints results.

mod batch;
mod cli;
mod config;
mod filter;
mod ingest;
mod models;
mod output;
mod summary;
mod utils;
mod xmlstream;

use batch::{BatchOptions, IngestListener};
use clap::Parser;
use cli::{Cli, Commands};
use models::Diagnostic;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

/// Listener that echoes per-file progress to stderr, the way a build log
/// would show it. Diagnostics are printed once by the output layer.
struct ConsoleListener {
    root: PathBuf,
}

impl IngestListener for ConsoleListener {
    fn parsing(&self, path: &Path) {
        eprintln!(
            "{} parsing result file: {}",
            utils::note_prefix(),
            utils::display_path(path, &self.root)
        );
    }

    fn diagnostic(&self, _diagnostic: &Diagnostic) {}
}

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Ingest {
            patterns,
            repo_root,
            threads,
            output,
            ignore_freshness,
            newer_than,
        } => {
            let eff = config::resolve_effective(
                repo_root.as_deref(),
                threads,
                output.as_deref(),
                if ignore_freshness { Some(true) } else { None },
                &patterns,
            );
            if eff.patterns.is_empty() {
                eprintln!(
                    "{} {}",
                    utils::error_prefix(),
                    "No file patterns given. Pass patterns or add them to intrep.toml."
                );
                std::process::exit(2);
            }
            if config::load_config(&eff.repo_root).is_none() {
                eprintln!(
                    "{} {}",
                    utils::note_prefix(),
                    "No intrep.toml found; using defaults."
                );
            }
            let files = match batch::collect_report_files(&eff.repo_root, &eff.patterns) {
                Ok(files) => files,
                Err(e) => {
                    eprintln!(
                        "{} {}",
                        utils::error_prefix(),
                        format!("Invalid file pattern: {}", e)
                    );
                    std::process::exit(2);
                }
            };
            if files.is_empty() {
                eprintln!(
                    "{} {}",
                    utils::note_prefix(),
                    "No result files matched the given patterns."
                );
            }
            let options = BatchOptions {
                threads: eff.threads,
                freshness_baseline: newer_than
                    .map(|secs| UNIX_EPOCH + Duration::from_secs(secs)),
                ignore_freshness: eff.ignore_freshness,
            };
            let listener = ConsoleListener {
                root: eff.repo_root.clone(),
            };
            match batch::run_batch(&files, &options, &listener) {
                Ok((aggregate, diagnostics)) => {
                    output::print_ingest(&aggregate, &diagnostics, &eff.output);
                    if aggregate.totals().failure_count > 0 {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("{} {}", utils::error_prefix(), e);
                    std::process::exit(2);
                }
            }
        }
    }
}
