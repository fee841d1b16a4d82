// src/rules.rs
//! Keyword rule configuration (`config/rules.txt`).
//!
//! Two sections: `[include]` and `[exclude]`. Inside `[include]`, a line of
//! the form `<Name:ID>` switches the active category for the keyword lines
//! that follow; bare lines are keywords for the active category (category 1
//! until the first switch). Inside `[exclude]`, every line is an exclusion
//! substring. Lines are trimmed and lowercased; blank lines and `#` comments
//! are ignored.
//!
//! Declaration order is significant: the first-declared keyword found in a
//! message decides its category, so rules live in a `Vec`, not a map.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_CATEGORY: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub keyword: String,
    pub category: u32,
}

/// A `<Name:ID>` declaration, kept for logging and topic labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDecl {
    pub name: String,
    pub id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    pub exclusions: Vec<String>,
    pub categories: Vec<CategoryDecl>,
}

impl RuleSet {
    /// No inclusion keywords configured: every non-excluded, non-empty
    /// message passes with the default category.
    pub fn pass_through() -> Self {
        Self::default()
    }

    pub fn has_inclusion_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Load from a file; a missing file yields the pass-through set, which
    /// mirrors the optional topics config of the flat-text format.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no rules file, classification is pass-through");
            return Ok(Self::pass_through());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading rules from {}", path.display()))?;
        let set = Self::parse(&content);
        info!(
            keywords = set.rules.len(),
            exclusions = set.exclusions.len(),
            categories = set.categories.len(),
            "rules loaded"
        );
        Ok(set)
    }

    pub fn parse(content: &str) -> Self {
        static RE_DECL: OnceCell<Regex> = OnceCell::new();
        let re_decl = RE_DECL.get_or_init(|| Regex::new(r"^<([^:>]+):(\d+)>$").unwrap());

        #[derive(PartialEq)]
        enum Section {
            None,
            Include,
            Exclude,
        }

        let mut set = RuleSet::default();
        let mut section = Section::None;
        let mut active_category = DEFAULT_CATEGORY;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line {
                "[include]" => {
                    section = Section::Include;
                    continue;
                }
                "[exclude]" => {
                    section = Section::Exclude;
                    continue;
                }
                _ => {}
            }
            match section {
                Section::Include => {
                    if let Some(caps) = re_decl.captures(line) {
                        let name = caps[1].trim().to_string();
                        // Regex guarantees digits; an overflowing id is a config typo.
                        if let Ok(id) = caps[2].parse::<u32>() {
                            debug!(name = %name, id, "category declared");
                            active_category = id;
                            set.categories.push(CategoryDecl { name, id });
                        }
                    } else {
                        set.rules.push(Rule {
                            keyword: line.to_lowercase(),
                            category: active_category,
                        });
                    }
                }
                Section::Exclude => set.exclusions.push(line.to_lowercase()),
                Section::None => {}
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# job digest rules
[include]
rust
<Remote:2>
remote
удаленка

<Senior:3>
senior

[exclude]
junior
intern
";

    #[test]
    fn sections_and_category_switches() {
        let set = RuleSet::parse(SAMPLE);
        assert_eq!(
            set.rules,
            vec![
                Rule { keyword: "rust".into(), category: 1 },
                Rule { keyword: "remote".into(), category: 2 },
                Rule { keyword: "удаленка".into(), category: 2 },
                Rule { keyword: "senior".into(), category: 3 },
            ]
        );
        assert_eq!(set.exclusions, vec!["junior", "intern"]);
        assert_eq!(set.categories.len(), 2);
        assert_eq!(set.categories[0], CategoryDecl { name: "Remote".into(), id: 2 });
    }

    #[test]
    fn keywords_are_lowercased() {
        let set = RuleSet::parse("[include]\nRuSt\n[exclude]\nJUNIOR\n");
        assert_eq!(set.rules[0].keyword, "rust");
        assert_eq!(set.exclusions[0], "junior");
    }

    #[test]
    fn lines_outside_sections_are_ignored() {
        let set = RuleSet::parse("stray\n[include]\nrust\n");
        assert_eq!(set.rules.len(), 1);
    }

    #[test]
    fn exclude_only_file_has_no_inclusion_rules() {
        let set = RuleSet::parse("[exclude]\njunior\n");
        assert!(!set.has_inclusion_rules());
        assert_eq!(set.exclusions, vec!["junior"]);
    }
}
