// src/engine.rs
//! Pass orchestration: scan -> compose -> dispatch.
//!
//! The offset store lives behind a mutex held for the whole pass, so a
//! scheduler tick and a manual trigger can never interleave: watermark
//! commits of one pass are visible to the next, never to a concurrent one.

use metrics::{counter, gauge};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::digest::compose;
use crate::dispatch::Dispatcher;
use crate::offsets::OffsetStore;
use crate::reader::SourceReader;
use crate::rules::RuleSet;
use crate::scanner::scan;
use crate::settings::Settings;

pub struct DigestEngine {
    settings: Settings,
    sources: Vec<String>,
    rules: RuleSet,
    reader: Box<dyn SourceReader>,
    dispatcher: Box<dyn Dispatcher>,
    store: Mutex<OffsetStore>,
}

impl DigestEngine {
    pub fn new(
        settings: Settings,
        sources: Vec<String>,
        rules: RuleSet,
        reader: Box<dyn SourceReader>,
        dispatcher: Box<dyn Dispatcher>,
        store: OffsetStore,
    ) -> Self {
        Self {
            settings,
            sources,
            rules,
            reader,
            dispatcher,
            store: Mutex::new(store),
        }
    }

    /// Run one full pass and return a one-line human summary. Per-source and
    /// per-chunk failures are logged and skipped; the pass itself always
    /// completes.
    pub async fn run_pass(&self) -> String {
        let mut store = self.store.lock().await;

        counter!("scan_passes_total").increment(1);
        gauge!("scan_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        let (matches, stats) = scan(
            self.reader.as_ref(),
            &mut store,
            &self.sources,
            &self.rules,
            &self.settings.limits,
            &self.settings.link_base,
        )
        .await;

        let digests = compose(&matches, &stats, &self.settings.limits);
        let had_matches = !matches.is_empty();

        let mut sent = 0usize;
        for digest in &digests {
            counter!("digest_chunks_total").increment(digest.chunks.len() as u64);
            for chunk in &digest.chunks {
                match self
                    .dispatcher
                    .send(&self.settings.target_chat, chunk, digest.topic)
                    .await
                {
                    Ok(()) => {
                        sent += 1;
                        counter!("dispatch_sent_total").increment(1);
                    }
                    Err(e) => {
                        counter!("dispatch_errors_total").increment(1);
                        warn!(
                            category = digest.category,
                            error = ?e,
                            "dispatch failed, continuing with remaining chunks"
                        );
                    }
                }
            }
        }

        let summary = if had_matches {
            format!("Sent {sent} messages, {} matches.", matches.len())
        } else {
            // The status digest is a single chunk; reuse its text.
            digests[0].chunks[0].clone()
        };
        info!(
            sources = stats.scanned_sources,
            seen = stats.seen_messages,
            matches = matches.len(),
            sent,
            "pass complete"
        );
        summary
    }

    /// Watermark snapshot for the debug surface.
    pub async fn offsets_snapshot(&self) -> BTreeMap<String, u64> {
        self.store.lock().await.snapshot()
    }

    pub fn run_hours(&self) -> &[u32] {
        &self.settings.run_hours
    }
}
