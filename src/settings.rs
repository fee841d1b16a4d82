// src/settings.rs
//! Process configuration, resolved once at startup.
//!
//! Everything env-derived lands in [`Settings`]; volume limits may be
//! overridden by an optional `config/digest.toml`. Components receive these
//! values by parameter and never read the environment ad hoc.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_SOURCES_PATH: &str = "config/sources.txt";
pub const DEFAULT_RULES_PATH: &str = "config/rules.txt";
pub const DEFAULT_STATE_PATH: &str = "state/offsets.json";
pub const DEFAULT_LIMITS_PATH: &str = "config/digest.toml";
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8081";
pub const DEFAULT_LINK_BASE: &str = "https://t.me";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_RUN_HOURS: [u32; 3] = [10, 14, 18];

pub const ENV_SOURCES_PATH: &str = "SOURCES_PATH";
pub const ENV_RULES_PATH: &str = "RULES_PATH";
pub const ENV_STATE_PATH: &str = "STATE_PATH";
pub const ENV_LIMITS_PATH: &str = "DIGEST_LIMITS_PATH";
pub const ENV_TARGET_CHAT: &str = "TARGET_CHAT";
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_SOURCE_READER: &str = "SOURCE_READER";
pub const ENV_GATEWAY_URL: &str = "GATEWAY_URL";
pub const ENV_LINK_BASE: &str = "LINK_BASE";
pub const ENV_RUN_HOURS: &str = "RUN_HOURS";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";

/// Which reader implementation backs the sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    Gateway,
    Rss,
}

/// Volume limits for a scan pass and the composed digest.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Max messages fetched per source per pass.
    pub fetch_cap: usize,
    /// Max matches rendered per source within one category.
    pub per_source: usize,
    /// Max matches rendered per category in total.
    pub per_category: usize,
    /// Max characters per digest chunk (safely below the 4096 transport cap).
    pub chunk_len: usize,
    /// Visible characters per match snippet.
    pub snippet_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            fetch_cap: 300,
            per_source: 6,
            per_category: 60,
            chunk_len: 2200,
            snippet_len: 140,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub sources_path: PathBuf,
    pub rules_path: PathBuf,
    pub state_path: PathBuf,
    pub target_chat: String,
    pub bot_token: Option<String>,
    pub reader: ReaderKind,
    pub gateway_url: String,
    pub link_base: String,
    pub run_hours: Vec<u32>,
    pub bind_addr: String,
    pub limits: Limits,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let limits_path = env_or(ENV_LIMITS_PATH, DEFAULT_LIMITS_PATH);
        let limits = load_limits(Path::new(&limits_path))?;

        let reader = match env_or(ENV_SOURCE_READER, "gateway").to_ascii_lowercase().as_str() {
            "rss" => ReaderKind::Rss,
            "gateway" => ReaderKind::Gateway,
            other => {
                warn!(reader = other, "unknown SOURCE_READER, using gateway");
                ReaderKind::Gateway
            }
        };

        Ok(Self {
            sources_path: env_or(ENV_SOURCES_PATH, DEFAULT_SOURCES_PATH).into(),
            rules_path: env_or(ENV_RULES_PATH, DEFAULT_RULES_PATH).into(),
            state_path: env_or(ENV_STATE_PATH, DEFAULT_STATE_PATH).into(),
            target_chat: env_or(ENV_TARGET_CHAT, "me"),
            bot_token: std::env::var(ENV_BOT_TOKEN).ok().filter(|t| !t.trim().is_empty()),
            reader,
            gateway_url: env_or(ENV_GATEWAY_URL, DEFAULT_GATEWAY_URL),
            link_base: env_or(ENV_LINK_BASE, DEFAULT_LINK_BASE),
            run_hours: parse_run_hours(std::env::var(ENV_RUN_HOURS).ok().as_deref()),
            bind_addr: env_or(ENV_BIND_ADDR, DEFAULT_BIND_ADDR),
            limits,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse `RUN_HOURS` like `"10,14,18"`. Invalid entries are dropped; an
/// empty result falls back to the default schedule with a warning.
pub fn parse_run_hours(raw: Option<&str>) -> Vec<u32> {
    let Some(raw) = raw else {
        return DEFAULT_RUN_HOURS.to_vec();
    };
    let mut hours: Vec<u32> = raw
        .split(',')
        .filter_map(|h| h.trim().parse::<u32>().ok())
        .filter(|h| *h < 24)
        .collect();
    hours.sort_unstable();
    hours.dedup();
    if hours.is_empty() {
        warn!(raw, "RUN_HOURS unparseable, using default schedule");
        return DEFAULT_RUN_HOURS.to_vec();
    }
    hours
}

/// Missing limits file is fine (defaults apply); a present-but-broken one
/// is a configuration error worth failing on.
fn load_limits(path: &Path) -> Result<Limits> {
    if !path.exists() {
        return Ok(Limits::default());
    }
    #[derive(Deserialize)]
    struct LimitsFile {
        #[serde(default)]
        limits: Limits,
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading limits from {}", path.display()))?;
    let parsed: LimitsFile = toml::from_str(&content)
        .with_context(|| format!("parsing limits from {}", path.display()))?;
    Ok(parsed.limits)
}
