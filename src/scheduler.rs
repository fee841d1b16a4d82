// src/scheduler.rs
//! Wall-clock schedule: run a pass at each configured hour mark
//! (`RUN_HOURS`, local time), the polling cadence of the digest.

use chrono::{Local, NaiveTime, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::engine::DigestEngine;

pub fn spawn_scan_scheduler(engine: Arc<DigestEngine>) -> JoinHandle<()> {
    info!(hours = ?engine.run_hours(), "scan schedule active");
    tokio::spawn(async move {
        loop {
            let wait = duration_until_next_run(Local::now().time(), engine.run_hours());
            tokio::time::sleep(wait).await;
            let summary = engine.run_pass().await;
            info!(%summary, "scheduled pass finished");
        }
    })
}

/// Seconds until the next `HH:00` mark in `hours`, wrapping to tomorrow when
/// every mark has passed today.
fn duration_until_next_run(now: NaiveTime, hours: &[u32]) -> Duration {
    const DAY_SECS: u64 = 24 * 3600;
    if hours.is_empty() {
        return Duration::from_secs(DAY_SECS);
    }
    let now_secs = now.num_seconds_from_midnight() as u64;
    let next = hours
        .iter()
        .map(|h| u64::from(*h) * 3600)
        .find(|mark| *mark > now_secs)
        .unwrap_or_else(|| u64::from(hours[0]) * 3600 + DAY_SECS);
    Duration::from_secs(next - now_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn picks_next_mark_today() {
        let wait = duration_until_next_run(t(9, 30, 0), &[10, 14, 18]);
        assert_eq!(wait, Duration::from_secs(30 * 60));
    }

    #[test]
    fn skips_marks_already_passed() {
        let wait = duration_until_next_run(t(14, 0, 1), &[10, 14, 18]);
        assert_eq!(wait, Duration::from_secs(4 * 3600 - 1));
    }

    #[test]
    fn wraps_to_tomorrow_after_last_mark() {
        let wait = duration_until_next_run(t(20, 0, 0), &[10, 14, 18]);
        assert_eq!(wait, Duration::from_secs(14 * 3600));
    }

    #[test]
    fn exact_mark_waits_for_the_following_one() {
        let wait = duration_until_next_run(t(10, 0, 0), &[10, 14, 18]);
        assert_eq!(wait, Duration::from_secs(4 * 3600));
    }
}
