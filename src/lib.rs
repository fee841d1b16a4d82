// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod classify;
pub mod digest;
pub mod dispatch;
pub mod engine;
pub mod metrics;
pub mod offsets;
pub mod reader;
pub mod rules;
pub mod scanner;
pub mod scheduler;
pub mod settings;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::classify::{classify, Classification};
pub use crate::engine::DigestEngine;
pub use crate::offsets::OffsetStore;
pub use crate::reader::{FeedMessage, FetchError, SourceReader};
pub use crate::rules::RuleSet;
pub use crate::settings::{Limits, Settings};
