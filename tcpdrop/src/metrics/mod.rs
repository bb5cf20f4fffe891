//! # Metrics Aggregation
//!
//! Lock-free counters and latency samples shared between the ingestion task,
//! the progress reporter and the final report.
//!
//! - [`counters`]: `Counter` and the process-wide `Metrics` state
//! - [`latency`]: fixed-capacity latency ring with snapshot percentiles
//! - [`report`]: final report (rates, drop rate, percentiles), text and JSON
//! - [`reporter`]: once-per-second throughput line for benchmark runs

pub mod counters;
pub mod latency;
pub mod report;
pub mod reporter;

pub use counters::{Counter, Metrics};
pub use latency::{LatencyRing, LatencySnapshot, LATENCY_RING_CAPACITY};
pub use report::{drop_rate, per_second, resident_memory_bytes, LatencyPercentiles, MetricsReport};
pub use reporter::{join_progress_reporter, spawn_progress_reporter, RateTracker};
