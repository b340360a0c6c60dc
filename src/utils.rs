//! Supporting helpers: colored message prefixes and path display.

use owo_colors::OwoColorize;
use std::path::Path;

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Prefix for fatal/error lines on stderr.
pub fn error_prefix() -> String {
    if colors_enabled() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

/// Prefix for advisory notes on stderr.
pub fn note_prefix() -> String {
    if colors_enabled() {
        "note:".blue().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Prefix for per-file warnings on stderr.
pub fn warn_prefix() -> String {
    if colors_enabled() {
        "warn:".yellow().bold().to_string()
    } else {
        "warn:".to_string()
    }
}

/// Render `path` relative to `root` when possible, for shorter output.
pub fn display_path(path: &Path, root: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_display_path_relativizes_under_root() {
        let root = PathBuf::from("/repo");
        let path = PathBuf::from("/repo/reports/a.html");
        assert_eq!(display_path(&path, &root), "reports/a.html");
    }

    #[test]
    fn test_display_path_keeps_unrelated_paths_usable() {
        let root = PathBuf::from("/repo");
        let path = PathBuf::from("/elsewhere/a.html");
        let shown = display_path(&path, &root);
        assert!(shown.ends_with("a.html"));
    }
}
