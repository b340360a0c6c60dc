//! Intrep core library.
//!
//! This crate parses Integrity test result files (plain XML, or HTML
//! wrapping an embedded `<xmldata>` island) and aggregates their summary
//! counts across many files in parallel.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `filter`: Bracket-escaping repair filter for HTML-wrapped files.
//! - `xmlstream`: Streaming XML pull parser (element events only).
//! - `summary`: Summary-count extraction with early parse termination.
//! - `ingest`: Per-file ingestion producing one record per file.
//! - `batch`: Bounded-concurrency ingestion across a file set.
//! - `models`: Record, diagnostic, and aggregate data models.
//! - `output`: Human/JSON printers for the aggregate.
//! - `utils`: Supporting helpers.
pub mod batch;
pub mod cli;
pub mod config;
pub mod filter;
pub mod ingest;
pub mod models;
pub mod output;
pub mod summary;
pub mod utils;
pub mod xmlstream;
