//! Periodic throughput reporting
//!
//! Prints one status line per second to stderr so it never mixes with event
//! lines on stdout:
//!
//! ```text
//! [14:02:11] Rate:   184233 ev/s | Total:    1842330 | Mem:   9.4 MB
//! ```

#![allow(clippy::cast_precision_loss)]

use log::warn;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::report::{per_second, resident_memory_bytes};
use super::Metrics;

/// Reporting interval
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Events/sec over the interval since the previous sample
#[derive(Debug, Clone, Copy)]
pub struct RateTracker {
    last_total: u64,
    last_at: Instant,
}

impl RateTracker {
    #[must_use]
    pub fn new(now: Instant, total: u64) -> Self {
        Self { last_total: total, last_at: now }
    }

    /// Rate since the last call; 0 if no time has passed
    pub fn sample(&mut self, now: Instant, total: u64) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_at).as_secs_f64();
        let delta = total.saturating_sub(self.last_total);

        self.last_total = total;
        self.last_at = now;

        per_second(delta as f64, elapsed)
    }
}

/// Spawn the once-per-second reporter; it exits when `cancel` fires
pub fn spawn_progress_reporter(metrics: Arc<Metrics>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(REPORT_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        let mut tracker = RateTracker::new(Instant::now(), metrics.events_read.get());

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let total = metrics.events_read.get();
            let rate = tracker.sample(Instant::now(), total);
            let mem_mb = resident_memory_bytes().map_or(0.0, |b| b as f64 / 1024.0 / 1024.0);

            eprintln!(
                "[{}] Rate: {rate:8.0} ev/s | Total: {total:10} | Mem: {mem_mb:5.1} MB",
                chrono::Local::now().format("%H:%M:%S"),
            );
        }
    })
}

/// Wait for the reporter to exit; returns `false` if it panicked
pub async fn join_progress_reporter(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Progress reporter failed: {e}");
            false
        }
    }
}
