//! Bounded latency history
//!
//! The ring keeps the last [`LATENCY_RING_CAPACITY`] samples and nothing
//! else. Percentiles over it are an approximation of recent behaviour, not a
//! streaming quantile over the whole run: older samples are overwritten.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Number of latency samples retained
pub const LATENCY_RING_CAPACITY: usize = 10_000;

/// Fixed-capacity circular buffer of latency samples (microseconds)
///
/// Slot `i` holds the most recent sample whose write index modulo the
/// capacity is `i`. A zero slot has never been written.
#[derive(Debug)]
pub struct LatencyRing {
    slots: Box<[AtomicU64]>,
    cursor: AtomicUsize,
}

impl LatencyRing {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: (0..LATENCY_RING_CAPACITY).map(|_| AtomicU64::new(0)).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Store a sample, overwriting the oldest one once the ring is full
    ///
    /// The cursor advance is atomic, so concurrent writers never share a slot
    /// within one lap of the ring.
    pub fn record(&self, micros: u64) {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        self.slots[index].store(micros, Ordering::Relaxed);
    }

    /// Total number of samples ever recorded
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Copy the populated slots into a sorted snapshot
    #[must_use]
    pub fn snapshot(&self) -> LatencySnapshot {
        let mut samples: Vec<u64> = self
            .slots
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .filter(|&micros| micros != 0)
            .collect();
        samples.sort_unstable();
        LatencySnapshot { samples }
    }

    /// Sample at quantile `p` (0.0..=1.0), or 0 when nothing was recorded
    #[must_use]
    pub fn percentile(&self, p: f64) -> u64 {
        self.snapshot().percentile(p)
    }
}

impl Default for LatencyRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorted copy of the populated ring slots
#[derive(Debug, Clone, Default)]
pub struct LatencySnapshot {
    samples: Vec<u64>,
}

impl LatencySnapshot {
    /// Value at index `floor(len * p)`, clamped to the last sample
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn percentile(&self, p: f64) -> u64 {
        let Some(last) = self.samples.len().checked_sub(1) else {
            return 0;
        };
        let rank = (self.samples.len() as f64 * p.clamp(0.0, 1.0)).floor() as usize;
        self.samples[rank.min(last)]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
