//! Job Digest Service — Binary Entrypoint
//! Wires the scan engine to its reader, dispatcher, schedule, and the HTTP
//! trigger surface.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use job_digest::api::{self, AppState};
use job_digest::dispatch::{telegram::TelegramDispatcher, Dispatcher, LogDispatcher};
use job_digest::engine::DigestEngine;
use job_digest::metrics::Metrics;
use job_digest::offsets::OffsetStore;
use job_digest::reader::{gateway::GatewayReader, rss::RssReader, SourceReader};
use job_digest::rules::RuleSet;
use job_digest::scheduler::spawn_scan_scheduler;
use job_digest::settings::{ReaderKind, Settings};
use job_digest::sources::load_sources;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when variables come from the environment.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    let settings = Settings::from_env()?;

    // The source list is the one required input; its absence is fatal.
    let sources = load_sources(&settings.sources_path)
        .with_context(|| format!("no source list at {}", settings.sources_path.display()))?;
    let rules = RuleSet::load(&settings.rules_path)?;
    let store = OffsetStore::open(&settings.state_path)?;

    let reader: Box<dyn SourceReader> = match settings.reader {
        ReaderKind::Gateway => Box::new(GatewayReader::from_url(&settings.gateway_url)),
        ReaderKind::Rss => Box::new(RssReader::new()),
    };
    let dispatcher: Box<dyn Dispatcher> = match settings.bot_token.clone() {
        Some(token) => Box::new(TelegramDispatcher::new(token)),
        None => {
            warn!("TELEGRAM_BOT_TOKEN not set, digests go to the log only");
            Box::new(LogDispatcher)
        }
    };
    info!(
        sources = sources.len(),
        reader = reader.name(),
        dispatcher = dispatcher.name(),
        target = %settings.target_chat,
        "job-digest starting"
    );

    let metrics = Metrics::init();
    let bind_addr = settings.bind_addr.clone();
    let engine = Arc::new(DigestEngine::new(
        settings, sources, rules, reader, dispatcher, store,
    ));

    // One pass right away, then the wall-clock schedule takes over.
    let summary = engine.run_pass().await;
    info!(%summary, "startup pass");
    spawn_scan_scheduler(engine.clone());

    let router = api::create_router(AppState { engine }).merge(metrics.router());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!(addr = %bind_addr, "http surface up");
    axum::serve(listener, router).await?;
    Ok(())
}
