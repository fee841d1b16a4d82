// src/scanner.rs
//! One scan pass: per source, pull the unseen window, classify, and commit
//! the watermark.
//!
//! Any per-source failure (unresolvable, access denied, transient fetch)
//! skips that source for this pass and leaves its watermark untouched, so
//! the same window is retried next pass. The watermark itself advances by
//! the max id seen regardless of inclusion — excluded messages are never
//! re-evaluated.

use metrics::counter;
use tracing::{info, warn};

use crate::classify::classify;
use crate::offsets::OffsetStore;
use crate::reader::{FetchError, SourceReader};
use crate::rules::RuleSet;
use crate::settings::Limits;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub scanned_sources: usize,
    pub seen_messages: usize,
}

/// A message that survived filtering, ready for digest composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub source: String,
    pub message_id: u64,
    pub category: u32,
    pub highlighted: String,
    pub permalink: String,
}

pub async fn scan(
    reader: &dyn SourceReader,
    store: &mut OffsetStore,
    sources: &[String],
    rules: &RuleSet,
    limits: &Limits,
    link_base: &str,
) -> (Vec<MatchRecord>, ScanStats) {
    let mut matches = Vec::new();
    let mut stats = ScanStats::default();

    for source in sources {
        stats.scanned_sources += 1;

        let handle = match reader.resolve(source).await {
            Ok(h) => h,
            Err(e) => {
                skip_source(source, &e);
                continue;
            }
        };

        let watermark = store.get(source);
        let window = match reader
            .fetch_newer(&handle, watermark, limits.fetch_cap)
            .await
        {
            Ok(w) => w,
            Err(e) => {
                skip_source(source, &e);
                continue;
            }
        };

        let mut max_seen = watermark;
        for message in &window {
            stats.seen_messages += 1;
            if message.id > max_seen {
                max_seen = message.id;
            }

            let outcome = classify(&message.text, rules);
            if !outcome.included {
                continue;
            }
            let permalink = message
                .url
                .clone()
                .unwrap_or_else(|| format!("{link_base}/{source}/{}", message.id));
            matches.push(MatchRecord {
                source: source.clone(),
                message_id: message.id,
                category: outcome.category,
                highlighted: outcome.highlighted,
                permalink,
            });
        }

        // Commit only after the whole window is classified.
        if max_seen > watermark {
            match store.set_if_greater(source, max_seen) {
                Ok(_) => info!(source = %source, watermark = max_seen, "watermark advanced"),
                Err(e) => warn!(source = %source, error = ?e, "failed to persist watermark"),
            }
        }
    }

    counter!("scan_sources_total").increment(stats.scanned_sources as u64);
    counter!("scan_messages_seen_total").increment(stats.seen_messages as u64);
    counter!("scan_matches_total").increment(matches.len() as u64);

    (matches, stats)
}

fn skip_source(source: &str, e: &FetchError) {
    counter!("scan_source_errors_total").increment(1);
    match e {
        FetchError::Unresolvable(_) => warn!(source, "could not resolve source, skipping"),
        FetchError::AccessDenied(_) => {
            warn!(source, "access denied, skipping (are you subscribed?)")
        }
        FetchError::Transient(err) => warn!(source, error = ?err, "fetch failed, skipping"),
    }
}
