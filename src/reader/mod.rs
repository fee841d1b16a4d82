// src/reader/mod.rs
//! Source reader seam: resolving a source identifier to a channel handle and
//! pulling messages newer than a watermark, newest-first, up to a limit.

pub mod gateway;
pub mod rss;

use async_trait::async_trait;

/// A message pulled from a source. Ids are monotone per source; `url` is the
/// message's own permalink when the source provides one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeedMessage {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// A resolved source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub slug: String,
}

/// Fetch outcomes the scanner reacts to. All three skip the source for the
/// current pass without touching its watermark; `Transient` is the safe-retry
/// case (timeouts, 5xx, parse failures).
#[derive(Debug)]
pub enum FetchError {
    Unresolvable(String),
    AccessDenied(String),
    Transient(anyhow::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Unresolvable(s) => write!(f, "source unresolvable: {s}"),
            FetchError::AccessDenied(s) => write!(f, "access denied: {s}"),
            FetchError::Transient(e) => write!(f, "transient fetch error: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Resolve a normalized source identifier to a channel handle.
    async fn resolve(&self, source: &str) -> Result<ChannelHandle, FetchError>;

    /// Messages with id > `min_id`, newest-first, at most `limit` of them.
    /// The window is finite and restartable; fetching again after a failed
    /// pass yields the same unseen messages.
    async fn fetch_newer(
        &self,
        handle: &ChannelHandle,
        min_id: u64,
        limit: usize,
    ) -> Result<Vec<FeedMessage>, FetchError>;

    fn name(&self) -> &'static str;
}
