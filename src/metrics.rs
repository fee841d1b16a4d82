use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and register the scan/dispatch series
    /// so they show up on /metrics before the first pass.
    pub fn init() -> Self {
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_metrics_described();
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scan_passes_total", "Completed scan passes.");
        describe_counter!("scan_sources_total", "Sources attempted across passes.");
        describe_counter!(
            "scan_messages_seen_total",
            "Messages fetched above the watermark."
        );
        describe_counter!("scan_matches_total", "Messages that survived filtering.");
        describe_counter!(
            "scan_source_errors_total",
            "Sources skipped (unresolvable/denied/transient)."
        );
        describe_counter!("digest_chunks_total", "Digest chunks composed.");
        describe_counter!("dispatch_sent_total", "Chunks delivered successfully.");
        describe_counter!("dispatch_errors_total", "Chunk deliveries that failed.");
        describe_histogram!("reader_fetch_ms", "Source fetch time in milliseconds.");
        describe_gauge!("scan_last_run_ts", "Unix ts when the last pass ran.");
    });
}
