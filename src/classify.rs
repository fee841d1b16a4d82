// src/classify.rs
//! Pure message classification: exclusion filtering, first-declared-keyword
//! category assignment, and HTML-safe keyword highlighting.
//!
//! `classify` does no I/O and holds no state, so the whole contract is unit
//! testable. Matching is case-insensitive substring search; the keyword
//! declared first in the rule file wins the category, regardless of where it
//! occurs in the text.

use crate::rules::{RuleSet, DEFAULT_CATEGORY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub included: bool,
    pub category: u32,
    /// Escaped text with every matching keyword occurrence wrapped in
    /// `<b>…</b>`; empty for excluded messages.
    pub highlighted: String,
}

impl Classification {
    fn excluded() -> Self {
        Self {
            included: false,
            category: DEFAULT_CATEGORY,
            highlighted: String::new(),
        }
    }
}

pub fn classify(text: &str, rules: &RuleSet) -> Classification {
    if text.is_empty() {
        return Classification::excluded();
    }

    // Char-aligned lowercase copy: one lowered char per original char, so
    // span indices found here slice the original text safely.
    let chars: Vec<char> = text.chars().collect();
    let lowered: Vec<char> = chars
        .iter()
        .map(|c| c.to_lowercase().next().unwrap_or(*c))
        .collect();
    let lowered_str: String = lowered.iter().collect();

    // Exclusion dominates inclusion, always.
    if rules
        .exclusions
        .iter()
        .any(|w| !w.is_empty() && lowered_str.contains(w.as_str()))
    {
        return Classification::excluded();
    }

    if !rules.has_inclusion_rules() {
        return Classification {
            included: true,
            category: DEFAULT_CATEGORY,
            highlighted: escape(&chars, 0, chars.len()),
        };
    }

    // First-declared matching keyword decides the category; every matching
    // keyword contributes highlight spans.
    let mut category = None;
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for rule in &rules.rules {
        let occurrences = find_occurrences(&lowered, &rule.keyword);
        if occurrences.is_empty() {
            continue;
        }
        if category.is_none() {
            category = Some(rule.category);
        }
        spans.extend(occurrences);
    }

    let Some(category) = category else {
        return Classification::excluded();
    };

    Classification {
        included: true,
        category,
        highlighted: render_highlighted(&chars, spans),
    }
}

/// All occurrences of `needle` in `haystack`, as char-index spans.
fn find_occurrences(haystack: &[char], needle: &str) -> Vec<(usize, usize)> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for start in 0..=(haystack.len() - needle.len()) {
        if haystack[start..start + needle.len()] == needle[..] {
            out.push((start, start + needle.len()));
        }
    }
    out
}

/// Merge spans by earliest start so the emitted markers never cross or
/// duplicate, then interleave escaped segments with `<b>` wrapping.
fn render_highlighted(chars: &[char], mut spans: Vec<(usize, usize)>) -> String {
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some((_, last_end)) if start < *last_end => *last_end = (*last_end).max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut out = String::with_capacity(chars.len() + merged.len() * 7);
    let mut cursor = 0;
    for (start, end) in merged {
        out.push_str(&escape(chars, cursor, start));
        out.push_str("<b>");
        out.push_str(&escape(chars, start, end));
        out.push_str("</b>");
        cursor = end;
    }
    out.push_str(&escape(chars, cursor, chars.len()));
    out
}

fn escape(chars: &[char], start: usize, end: usize) -> String {
    let segment: String = chars[start..end].iter().collect();
    html_escape::encode_text(&segment).into_owned()
}
