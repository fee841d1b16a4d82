// src/digest.rs
//! Digest composition: partition matches by category, cap volumes, render
//! HTML lines, and split into transport-safe chunks.
//!
//! Two-level caps keep one noisy source from starving a digest: a category
//! carries at most `per_category` matches overall and at most `per_source`
//! from any single source. Chunks never exceed `chunk_len` characters and
//! concatenating a category's chunks (part markers aside) reproduces the
//! rendered text exactly.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::BTreeMap;

use crate::rules::DEFAULT_CATEGORY;
use crate::scanner::{MatchRecord, ScanStats};
use crate::settings::Limits;

/// One category's rendered digest. `topic` is the thread marker for the
/// dispatcher; the default category goes to "no specific topic".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub category: u32,
    pub topic: Option<u32>,
    pub chunks: Vec<String>,
}

pub fn compose(matches: &[MatchRecord], stats: &ScanStats, limits: &Limits) -> Vec<Digest> {
    if matches.is_empty() {
        return vec![Digest {
            category: DEFAULT_CATEGORY,
            topic: None,
            chunks: vec![status_line(stats)],
        }];
    }

    let mut by_category: BTreeMap<u32, Vec<&MatchRecord>> = BTreeMap::new();
    for m in matches {
        by_category.entry(m.category).or_default().push(m);
    }

    let mut digests = Vec::with_capacity(by_category.len());
    for (category, mut hits) in by_category {
        // Most recent first, then the category-wide cap.
        hits.sort_by(|a, b| b.message_id.cmp(&a.message_id));
        hits.truncate(limits.per_category);

        let rendered = render_category(&hits, limits);
        let mut chunks = split_into_chunks(&rendered, limits.chunk_len);
        let total = chunks.len();
        if total > 1 {
            for (i, chunk) in chunks.iter_mut().enumerate() {
                *chunk = format!("<b>Digest ({}/{})</b>\n{}", i + 1, total, chunk);
            }
        }

        digests.push(Digest {
            category,
            topic: (category != DEFAULT_CATEGORY).then_some(category),
            chunks,
        });
    }
    digests
}

pub fn status_line(stats: &ScanStats) -> String {
    if stats.scanned_sources == 0 {
        "No new matches. Sources: 0.".to_string()
    } else {
        format!(
            "No new matches. Sources scanned: {}, messages seen: {}.",
            stats.scanned_sources, stats.seen_messages
        )
    }
}

/// Group a category's capped hit list by source (first-appearance order of
/// the id-descending list) and render header + item lines.
fn render_category(hits: &[&MatchRecord], limits: &Limits) -> String {
    let mut order: Vec<&str> = Vec::new();
    let mut by_source: BTreeMap<&str, Vec<&MatchRecord>> = BTreeMap::new();
    for m in hits {
        if !by_source.contains_key(m.source.as_str()) {
            order.push(&m.source);
        }
        by_source.entry(&m.source).or_default().push(m);
    }

    let mut lines: Vec<String> = Vec::new();
    for source in order {
        let items = &by_source[source];
        let shown = &items[..items.len().min(limits.per_source)];
        lines.push(format!(
            "🔎 <b>{}</b> — {}",
            html_escape::encode_text(source),
            shown.len()
        ));
        for m in shown {
            lines.push(format!(
                "• <a href=\"{}\">open</a> — {}",
                html_escape::encode_double_quoted_attribute(&m.permalink),
                snippet(&m.highlighted, limits.snippet_len)
            ));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Collapse whitespace and truncate to `limit` visible characters without
/// splitting a tag or entity; dangling markup is closed.
pub fn snippet(highlighted: &str, limit: usize) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    let flat = re_ws.replace_all(highlighted, " ");
    truncate_markup(flat.trim(), limit)
}

fn truncate_markup(s: &str, limit: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::new();
    let mut open: Vec<&str> = Vec::new();
    let mut visible = 0usize;
    let mut i = 0;

    while i < chars.len() && visible < limit {
        match chars[i] {
            '<' => {
                // Copy the whole tag; markup comes from our own renderer so
                // '>' is always present.
                let mut tag = String::new();
                while i < chars.len() {
                    tag.push(chars[i]);
                    i += 1;
                    if tag.ends_with('>') {
                        break;
                    }
                }
                if let Some(name) = tag.strip_prefix("</") {
                    let name = name.trim_end_matches('>');
                    if let Some(pos) = open.iter().rposition(|t| *t == name) {
                        open.remove(pos);
                    }
                } else if tag.starts_with("<b") {
                    open.push("b");
                } else if tag.starts_with("<a") {
                    open.push("a");
                }
                out.push_str(&tag);
            }
            '&' => {
                // Copy an entity atomically; it renders as one character.
                let mut entity = String::from('&');
                let mut j = i + 1;
                while j < chars.len() && j - i <= 8 && chars[j] != ';' {
                    entity.push(chars[j]);
                    j += 1;
                }
                if j < chars.len() && chars[j] == ';' {
                    entity.push(';');
                    i = j + 1;
                } else {
                    entity = String::from('&');
                    i += 1;
                }
                out.push_str(&entity);
                visible += 1;
            }
            c => {
                out.push(c);
                visible += 1;
                i += 1;
            }
        }
    }

    for tag in open.iter().rev() {
        out.push_str(&format!("</{tag}>"));
    }
    out
}

/// Split on line boundaries into chunks of at most `limit` characters; a
/// single line longer than the limit is hard-split at the limit. The chunks
/// concatenate back to `text` exactly.
pub fn split_into_chunks(text: &str, limit: usize) -> Vec<String> {
    debug_assert!(limit > 0);
    let mut chunks: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for segment in text.split_inclusive('\n') {
        let seg_chars = segment.chars().count();
        if seg_chars > limit {
            if !buf.is_empty() {
                chunks.push(std::mem::take(&mut buf));
                buf_chars = 0;
            }
            let mut rest = segment;
            while rest.chars().count() > limit {
                let cut = rest
                    .char_indices()
                    .nth(limit)
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                chunks.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            buf.push_str(rest);
            buf_chars = rest.chars().count();
            continue;
        }
        if buf_chars + seg_chars > limit {
            chunks.push(std::mem::take(&mut buf));
            buf_chars = 0;
        }
        buf.push_str(segment);
        buf_chars += seg_chars;
    }
    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}
