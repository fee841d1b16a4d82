// src/dispatch/mod.rs
//! Delivery seam: one `send` per rendered chunk, tagged with the category's
//! topic marker. Failures are the caller's to log; they never abort a pass.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Deliver pre-formatted HTML `text` to `destination`, optionally into
    /// a topic thread. Text is already bounded by the chunk limit.
    async fn send(&self, destination: &str, text: &str, topic: Option<u32>) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Tracing-only sink, used when no bot token is configured and in tests.
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn send(&self, destination: &str, text: &str, topic: Option<u32>) -> Result<()> {
        tracing::info!(destination, ?topic, chars = text.chars().count(), "digest chunk (dry run)");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
