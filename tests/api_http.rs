// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use job_digest::api::{create_router, AppState};
use job_digest::dispatch::LogDispatcher;
use job_digest::engine::DigestEngine;
use job_digest::offsets::OffsetStore;
use job_digest::reader::gateway::GatewayReader;
use job_digest::rules::RuleSet;
use job_digest::settings::{Limits, ReaderKind, Settings};

fn app(dir: &std::path::Path) -> Router {
    let settings = Settings {
        sources_path: "unused".into(),
        rules_path: "unused".into(),
        state_path: dir.join("offsets.json"),
        target_chat: "me".into(),
        bot_token: None,
        reader: ReaderKind::Gateway,
        gateway_url: String::new(),
        link_base: "https://t.me".into(),
        run_hours: vec![10],
        bind_addr: "127.0.0.1:0".into(),
        limits: Limits::default(),
    };
    let reader = GatewayReader::from_fixture_str(
        r#"{"chanA": [{"id": 7, "text": "Remote Rust role"}]}"#,
    )
    .unwrap();
    let store = OffsetStore::open(dir.join("offsets.json")).unwrap();
    let engine = DigestEngine::new(
        settings,
        vec!["chanA".to_string()],
        RuleSet::parse("[include]\nrust\n"),
        Box::new(reader),
        Box::new(LogDispatcher),
        store,
    );
    create_router(AppState { engine: Arc::new(engine) })
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let resp = app(dir.path())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn scan_endpoint_runs_a_pass_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/scan")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        String::from_utf8(body.to_vec()).unwrap(),
        "Sent 1 messages, 1 matches."
    );

    // The committed watermark is visible on the debug surface.
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/debug/offsets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["chanA"], 7);
}
