use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::engine::DigestEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DigestEngine>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/scan", post(trigger_scan))
        .route("/debug/offsets", get(debug_offsets))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// On-demand pass. Waits its turn behind a running scheduled pass and
/// returns the same one-line summary the scheduler logs.
async fn trigger_scan(State(state): State<AppState>) -> String {
    state.engine.run_pass().await
}

async fn debug_offsets(State(state): State<AppState>) -> Json<BTreeMap<String, u64>> {
    Json(state.engine.offsets_snapshot().await)
}
