// tests/pass_e2e.rs
// Full pass through the engine: fixture gateway reader in, recorded
// dispatcher calls out.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use job_digest::dispatch::Dispatcher;
use job_digest::engine::DigestEngine;
use job_digest::offsets::OffsetStore;
use job_digest::reader::gateway::GatewayReader;
use job_digest::rules::RuleSet;
use job_digest::settings::{Limits, ReaderKind, Settings};

#[derive(Clone, Default)]
struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<(String, String, Option<u32>)>>>,
    fail: bool,
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn send(&self, destination: &str, text: &str, topic: Option<u32>) -> Result<()> {
        if self.fail {
            anyhow::bail!("dispatch down");
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string(), topic));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn test_settings(state_path: std::path::PathBuf) -> Settings {
    Settings {
        sources_path: "unused".into(),
        rules_path: "unused".into(),
        state_path,
        target_chat: "me".into(),
        bot_token: None,
        reader: ReaderKind::Gateway,
        gateway_url: String::new(),
        link_base: "https://t.me".into(),
        run_hours: vec![10, 14, 18],
        bind_addr: "127.0.0.1:0".into(),
        limits: Limits::default(),
    }
}

fn rules() -> RuleSet {
    RuleSet::parse(
        "[include]\nrust\n<Remote:2>\nremote\nудаленка\n[exclude]\njunior\n",
    )
}

fn engine_with(dispatcher: RecordingDispatcher, dir: &std::path::Path) -> DigestEngine {
    let reader =
        GatewayReader::from_fixture_str(include_str!("fixtures/gateway_feed.json")).unwrap();
    let store = OffsetStore::open(dir.join("offsets.json")).unwrap();
    DigestEngine::new(
        test_settings(dir.join("offsets.json")),
        vec!["rust_jobs".to_string(), "remote_it_vacancies".to_string()],
        rules(),
        Box::new(reader),
        Box::new(dispatcher),
        store,
    )
}

#[tokio::test]
async fn first_pass_dispatches_per_category_then_goes_quiet() {
    let dispatcher = RecordingDispatcher::default();
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dispatcher.clone(), dir.path());

    let summary = engine.run_pass().await;
    // rust_jobs: 101 (rust, cat 1), 104 (rust, cat 1); 102 excluded (junior),
    // 103 no keyword. remote_it_vacancies: 11 + 12 (cat 2), empty 13 dropped.
    assert_eq!(summary, "Sent 2 messages, 4 matches.");

    let sent = dispatcher.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(dest, _, _)| dest == "me"));

    let (_, general, topic1) = &sent[0];
    assert_eq!(*topic1, None);
    assert!(general.contains("<b>rust_jobs</b> — 2"));
    assert!(general.contains("https://t.me/rust_jobs/104"));
    assert!(general.contains("<b>Rust</b>"));
    assert!(!general.contains("Junior"));

    let (_, remote, topic2) = &sent[1];
    assert_eq!(*topic2, Some(2));
    assert!(remote.contains("<b>remote_it_vacancies</b> — 2"));
    assert!(remote.contains("<b>Remote</b> DevOps"));

    let offsets = engine.offsets_snapshot().await;
    assert_eq!(offsets["rust_jobs"], 104);
    assert_eq!(offsets["remote_it_vacancies"], 13);

    // Unchanged upstream: the next pass reports status only.
    let summary2 = engine.run_pass().await;
    assert_eq!(
        summary2,
        "No new matches. Sources scanned: 2, messages seen: 0."
    );
    let sent2 = dispatcher.sent.lock().unwrap();
    assert_eq!(sent2.len(), 3);
    assert_eq!(sent2[2].1, summary2);
}

#[tokio::test]
async fn dispatch_failures_do_not_abort_the_pass() {
    let dispatcher = RecordingDispatcher { fail: true, ..Default::default() };
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dispatcher, dir.path());

    let summary = engine.run_pass().await;
    assert_eq!(summary, "Sent 0 messages, 4 matches.");

    // Watermarks committed even though delivery failed; a failed chunk is
    // not retried within the pass.
    let offsets = engine.offsets_snapshot().await;
    assert_eq!(offsets["rust_jobs"], 104);
}

#[tokio::test]
async fn empty_source_list_reports_status() {
    let dispatcher = RecordingDispatcher::default();
    let dir = tempfile::tempdir().unwrap();
    let reader = GatewayReader::from_fixture_str("{}").unwrap();
    let store = OffsetStore::open(dir.path().join("offsets.json")).unwrap();
    let engine = DigestEngine::new(
        test_settings(dir.path().join("offsets.json")),
        Vec::new(),
        rules(),
        Box::new(reader),
        Box::new(dispatcher.clone()),
        store,
    );

    let summary = engine.run_pass().await;
    assert_eq!(summary, "No new matches. Sources: 0.");
    let sent = dispatcher.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].2, None);
}
