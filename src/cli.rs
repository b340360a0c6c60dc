//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "intrep",
    version,
    about = "Integrity test report ingestion",
    long_about = "Intrep — parse Integrity test result files (XML or HTML-wrapped) concurrently and aggregate their pass/fail/exception counts.\n\nConfiguration precedence: CLI > environment > intrep.toml > defaults.",
    after_help = "Examples:\n  intrep ingest 'reports/**/*.html'\n  intrep ingest 'out/*.xml' 'out/*.html' --threads 8 --output json\n  intrep ingest 'reports/**/*.html' --newer-than 1719878400",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current intrep version.")]
    Version,
    /// Ingest result files and print the aggregate
    #[command(
        about = "Ingest result files",
        long_about = "Expand glob patterns, parse every matched result file on a bounded worker pool, and print the aggregated counts. Malformed files yield zero-count entries with diagnostics; they never abort the batch.",
        after_help = "Examples:\n  intrep ingest 'reports/**/*.html'\n  intrep ingest 'reports/**/*.html' --output json"
    )]
    Ingest {
        #[arg(help = "Glob patterns selecting result files, relative to the repo root")]
        patterns: Vec<String>,
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Worker threads (default: 16, clamped to available cores)")]
        threads: Option<usize>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Ingest files regardless of modification time")]
        ignore_freshness: bool,
        #[arg(long, help = "Skip files not modified since this UNIX timestamp (seconds)")]
        newer_than: Option<u64>,
    },
}
