// src/reader/gateway.rs
//! HTTP gateway reader: an authenticated sidecar exposes channel history as
//! plain JSON, this reader adapts it to the `SourceReader` seam.
//!
//! Endpoints:
//!   GET {base}/channels/{source}                  -> { "slug": "..." }
//!   GET {base}/channels/{slug}/messages?min_id=&limit=  -> [ FeedMessage ]
//!
//! A fixture mode backs tests with the same code path minus the network.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{ChannelHandle, FeedMessage, FetchError, SourceReader};

pub struct GatewayReader {
    mode: Mode,
}

enum Mode {
    Fixture(HashMap<String, Vec<FeedMessage>>),
    Http {
        base: String,
        client: reqwest::Client,
        timeout: Duration,
    },
}

#[derive(Deserialize)]
struct ResolveResponse {
    slug: String,
}

impl GatewayReader {
    pub fn from_url(base: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                base: base.into().trim_end_matches('/').to_string(),
                client: reqwest::Client::new(),
                timeout: Duration::from_secs(10),
            },
        }
    }

    /// Fixture payload: JSON object mapping source slug to its messages.
    pub fn from_fixture_str(json: &str) -> anyhow::Result<Self> {
        let channels: HashMap<String, Vec<FeedMessage>> =
            serde_json::from_str(json).context("parsing gateway fixture")?;
        Ok(Self {
            mode: Mode::Fixture(channels),
        })
    }

    fn classify_status(status: StatusCode, source: &str) -> Option<FetchError> {
        match status {
            StatusCode::NOT_FOUND => Some(FetchError::Unresolvable(source.to_string())),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                Some(FetchError::AccessDenied(source.to_string()))
            }
            s if s.is_success() => None,
            s => Some(FetchError::Transient(anyhow!("gateway returned {s}"))),
        }
    }
}

/// The scanner relies on the newest-first, `> min_id`, bounded window
/// contract; enforce it here rather than trusting the gateway.
fn bound_window(mut messages: Vec<FeedMessage>, min_id: u64, limit: usize) -> Vec<FeedMessage> {
    messages.retain(|m| m.id > min_id);
    messages.sort_unstable_by(|a, b| b.id.cmp(&a.id));
    messages.truncate(limit);
    messages
}

#[async_trait]
impl SourceReader for GatewayReader {
    async fn resolve(&self, source: &str) -> Result<ChannelHandle, FetchError> {
        match &self.mode {
            Mode::Fixture(channels) => {
                if channels.contains_key(source) {
                    Ok(ChannelHandle { slug: source.to_string() })
                } else {
                    Err(FetchError::Unresolvable(source.to_string()))
                }
            }
            Mode::Http { base, client, timeout } => {
                let url = format!("{base}/channels/{source}");
                let resp = client
                    .get(&url)
                    .timeout(*timeout)
                    .send()
                    .await
                    .map_err(|e| FetchError::Transient(anyhow!(e)))?;
                if let Some(err) = Self::classify_status(resp.status(), source) {
                    return Err(err);
                }
                let body: ResolveResponse = resp
                    .json()
                    .await
                    .map_err(|e| FetchError::Transient(anyhow!(e)))?;
                Ok(ChannelHandle { slug: body.slug })
            }
        }
    }

    async fn fetch_newer(
        &self,
        handle: &ChannelHandle,
        min_id: u64,
        limit: usize,
    ) -> Result<Vec<FeedMessage>, FetchError> {
        match &self.mode {
            Mode::Fixture(channels) => {
                let messages = channels.get(&handle.slug).cloned().unwrap_or_default();
                Ok(bound_window(messages, min_id, limit))
            }
            Mode::Http { base, client, timeout } => {
                let t0 = std::time::Instant::now();
                let url = format!(
                    "{base}/channels/{}/messages?min_id={min_id}&limit={limit}",
                    handle.slug
                );
                let resp = client
                    .get(&url)
                    .timeout(*timeout)
                    .send()
                    .await
                    .map_err(|e| FetchError::Transient(anyhow!(e)))?;
                if let Some(err) = Self::classify_status(resp.status(), &handle.slug) {
                    return Err(err);
                }
                let messages: Vec<FeedMessage> = resp
                    .json()
                    .await
                    .map_err(|e| FetchError::Transient(anyhow!(e)))?;
                histogram!("reader_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                Ok(bound_window(messages, min_id, limit))
            }
        }
    }

    fn name(&self) -> &'static str {
        "gateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: u64, text: &str) -> FeedMessage {
        FeedMessage { id, text: text.to_string(), url: None }
    }

    #[test]
    fn window_is_filtered_sorted_and_bounded() {
        let messages = vec![msg(3, "c"), msg(1, "a"), msg(5, "e"), msg(2, "b")];
        let out = bound_window(messages, 1, 2);
        assert_eq!(out.iter().map(|m| m.id).collect::<Vec<_>>(), vec![5, 3]);
    }

    #[tokio::test]
    async fn fixture_resolves_known_sources_only() {
        let reader =
            GatewayReader::from_fixture_str(r#"{"chanA": [{"id": 1, "text": "hi"}]}"#).unwrap();
        assert!(reader.resolve("chanA").await.is_ok());
        assert!(matches!(
            reader.resolve("ghost").await,
            Err(FetchError::Unresolvable(_))
        ));
    }

    #[tokio::test]
    async fn fixture_fetch_respects_min_id() {
        let reader = GatewayReader::from_fixture_str(
            r#"{"chanA": [{"id": 1, "text": "a"}, {"id": 2, "text": "b"}, {"id": 3, "text": "c"}]}"#,
        )
        .unwrap();
        let handle = reader.resolve("chanA").await.unwrap();
        let out = reader.fetch_newer(&handle, 1, 300).await.unwrap();
        assert_eq!(out.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 2]);
    }
}
