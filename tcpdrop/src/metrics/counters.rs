use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::latency::LatencyRing;

/// Monotonic event counter
///
/// Each counter is independently atomic; no ordering is implied between
/// counters, so `Relaxed` is enough.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn incr(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Process-wide ingestion and output metrics
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    /// Records decoded successfully
    pub events_read: Counter,
    /// Records rejected by the decoder
    pub events_dropped: Counter,
    /// Failed reads from the event source
    pub ring_errors: Counter,
    /// Raw record bytes of decoded events
    pub bytes_processed: Counter,
    /// Events formatted by the output pipeline
    pub events_printed: Counter,
    /// Bytes appended to the output buffer
    pub bytes_written: Counter,
    /// Time spent waiting in the event source read, in microseconds
    pub latency: LatencyRing,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            events_read: Counter::default(),
            events_dropped: Counter::default(),
            ring_errors: Counter::default(),
            bytes_processed: Counter::default(),
            events_printed: Counter::default(),
            bytes_written: Counter::default(),
            latency: LatencyRing::new(),
        }
    }

    /// Wall time since these metrics were created
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record one read latency sample
    ///
    /// Sub-microsecond reads are stored as 1µs: a zero slot means "never written".
    #[allow(clippy::cast_possible_truncation)]
    pub fn record_latency(&self, elapsed: Duration) {
        let micros = elapsed.as_micros().min(u128::from(u64::MAX)) as u64;
        self.latency.record(micros.max(1));
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
