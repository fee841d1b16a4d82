// src/sources.rs
//! Source list loading and identifier normalization.
//!
//! The list is plain text, one source per line; blank lines and `#` comments
//! are ignored. Identifiers are normalized by stripping link-style prefixes
//! so `https://t.me/rust_jobs` and `rust_jobs` name the same channel.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const STRIP_PREFIXES: [&str; 3] = ["https://t.me/", "http://t.me/", "t.me/"];

/// Normalize a single identifier. Public so readers can apply the same
/// rule to externally supplied names.
pub fn normalize_source(raw: &str) -> String {
    let mut s = raw.trim();
    for p in STRIP_PREFIXES {
        if let Some(rest) = s.strip_prefix(p) {
            s = rest;
            break;
        }
    }
    s.trim_matches('/').to_string()
}

/// Load and normalize the source list. A missing file is a fatal
/// configuration error for the caller to report.
pub fn load_sources(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source list from {}", path.display()))?;
    Ok(parse_sources(&content))
}

pub fn parse_sources(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(normalize_source)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_prefixes() {
        assert_eq!(normalize_source("https://t.me/rust_jobs"), "rust_jobs");
        assert_eq!(normalize_source("http://t.me/rust_jobs"), "rust_jobs");
        assert_eq!(normalize_source("t.me/rust_jobs/"), "rust_jobs");
        assert_eq!(normalize_source("rust_jobs"), "rust_jobs");
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let content = "# remote boards\n\nhttps://t.me/remote_jobs\n  \n#off\nit_vacancies\n";
        assert_eq!(parse_sources(content), vec!["remote_jobs", "it_vacancies"]);
    }

    #[test]
    fn declaration_order_is_preserved() {
        let content = "beta\nalpha\ngamma\n";
        assert_eq!(parse_sources(content), vec!["beta", "alpha", "gamma"]);
    }
}
