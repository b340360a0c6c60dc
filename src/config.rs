//! Configuration discovery and effective settings resolution.
//!
//! Intrep reads `intrep.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with environment variables and CLI
//! flags into an `Effective` config. Defaults:
//! - `threads`: 16 (clamped to available cores at dispatch time)
//! - `ignore_freshness`: false
//! - `output`: `human`
//! - `patterns`: none (the ingest command requires at least one)
//!
//! Overrides precedence: CLI > environment > config file > defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default worker count before hardware clamping.
pub const DEFAULT_THREADS: usize = 16;

/// Environment override for the worker count.
pub const THREADS_ENV: &str = "INTREP_THREADS";

/// Environment switch bypassing the file-freshness filter.
pub const IGNORE_FRESHNESS_ENV: &str = "INTREP_IGNORE_FRESHNESS";

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `intrep.toml|yaml`.
pub struct IntrepConfig {
    pub threads: Option<usize>,
    #[serde(rename = "ignoreFreshness")]
    pub ignore_freshness: Option<bool>,
    pub output: Option<String>,
    #[serde(default)]
    pub patterns: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying
/// precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    /// Requested worker count; the orchestrator clamps it to the
    /// hardware.
    pub threads: usize,
    pub ignore_freshness: bool,
    pub output: String,
    pub patterns: Vec<String>,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when an `intrep.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if cur.join("intrep.toml").exists()
            || cur.join("intrep.yaml").exists()
            || cur.join("intrep.yml").exists()
        {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `IntrepConfig` from `intrep.toml` or `intrep.yaml|yml` if present.
pub fn load_config(root: &Path) -> Option<IntrepConfig> {
    let toml_path = root.join("intrep.toml");
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).ok()?;
        let cfg: IntrepConfig = toml::from_str(&s).ok()?;
        return Some(cfg);
    }
    for yml in ["intrep.yaml", "intrep.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).ok()?;
            let cfg: IntrepConfig = serde_yaml::from_str(&s).ok()?;
            return Some(cfg);
        }
    }
    None
}

/// Resolve `Effective` by merging CLI flags, environment variables,
/// discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_threads: Option<usize>,
    cli_output: Option<&str>,
    cli_ignore_freshness: Option<bool>,
    cli_patterns: &[String],
) -> Effective {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root).unwrap_or_default();

    let threads = cli_threads
        .or_else(env_threads)
        .or(cfg.threads)
        .unwrap_or(DEFAULT_THREADS);

    let ignore_freshness = cli_ignore_freshness
        .or_else(|| env_flag(IGNORE_FRESHNESS_ENV))
        .or(cfg.ignore_freshness)
        .unwrap_or(false);

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let patterns = if cli_patterns.is_empty() {
        cfg.patterns.unwrap_or_default()
    } else {
        cli_patterns.to_vec()
    };

    Effective {
        repo_root,
        threads,
        ignore_freshness,
        output,
        patterns,
    }
}

fn env_threads() -> Option<usize> {
    std::env::var(THREADS_ENV).ok()?.trim().parse().ok()
}

/// Parse a boolean-ish environment variable. Unset or unrecognized values
/// resolve to `None` so the next precedence level applies.
fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    parse_flag(&value)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
