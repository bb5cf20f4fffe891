//! Final run report
//!
//! Rates are computed against wall time since the metrics were created. Every
//! division is guarded: a zero interval or an empty denominator yields `0.0`.

// Counters and byte totals are converted to f64 for display
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use super::Metrics;
use crate::domain::ReportError;

const MIB: f64 = 1024.0 * 1024.0;
const WIDTH: usize = 70;

/// `count / secs`, or 0 when no time has passed
#[must_use]
pub fn per_second(count: f64, secs: f64) -> f64 {
    if secs > 0.0 {
        count / secs
    } else {
        0.0
    }
}

/// Percentage of records rejected by the decoder
#[must_use]
pub fn drop_rate(read: u64, dropped: u64) -> f64 {
    let total = read.saturating_add(dropped);
    if total == 0 {
        0.0
    } else {
        dropped as f64 / total as f64 * 100.0
    }
}

/// Resident set size of this process, read from `/proc/self/statm`
#[must_use]
pub fn resident_memory_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;

    #[allow(unsafe_code)]
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    let page_size = u64::try_from(page_size).ok().filter(|&size| size > 0)?;

    Some(resident_pages * page_size)
}

/// Read latency percentiles in microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencyPercentiles {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

/// Everything printed when a run ends
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub mode: String,
    pub duration_seconds: f64,
    pub events_read: u64,
    pub events_dropped: u64,
    pub ring_errors: u64,
    pub bytes_processed: u64,
    pub events_printed: u64,
    pub bytes_written: u64,
    /// Records lost in the kernel because the ring buffer was full
    pub kernel_discards: Option<u64>,
    pub events_per_second: f64,
    pub print_rate: f64,
    pub processed_mb_per_second: f64,
    pub write_mb_per_second: f64,
    pub drop_rate_percent: f64,
    pub latency_us: LatencyPercentiles,
    pub latency_samples: usize,
    pub resident_memory_bytes: Option<u64>,
}

impl MetricsReport {
    /// Build a report from the current counter values
    #[must_use]
    pub fn from_metrics(mode: &str, metrics: &Metrics, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let events_read = metrics.events_read.get();
        let events_dropped = metrics.events_dropped.get();
        let bytes_processed = metrics.bytes_processed.get();
        let events_printed = metrics.events_printed.get();
        let bytes_written = metrics.bytes_written.get();

        let latency = metrics.latency.snapshot();

        Self {
            mode: mode.to_string(),
            duration_seconds: secs,
            events_read,
            events_dropped,
            ring_errors: metrics.ring_errors.get(),
            bytes_processed,
            events_printed,
            bytes_written,
            kernel_discards: None,
            events_per_second: per_second(events_read as f64, secs),
            print_rate: per_second(events_printed as f64, secs),
            processed_mb_per_second: per_second(bytes_processed as f64 / MIB, secs),
            write_mb_per_second: per_second(bytes_written as f64 / MIB, secs),
            drop_rate_percent: drop_rate(events_read, events_dropped),
            latency_us: LatencyPercentiles {
                p50: latency.percentile(0.50),
                p95: latency.percentile(0.95),
                p99: latency.percentile(0.99),
            },
            latency_samples: latency.len(),
            resident_memory_bytes: resident_memory_bytes(),
        }
    }

    #[must_use]
    pub fn with_kernel_discards(mut self, discards: Option<u64>) -> Self {
        self.kernel_discards = discards;
        self
    }

    /// Write the report as pretty-printed JSON
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written
    pub fn export_json(&self, path: &Path) -> Result<(), ReportError> {
        let write_failed = |source| ReportError::WriteFailed { path: path.to_path_buf(), source };

        let file = File::create(path).map_err(write_failed)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer).map_err(write_failed)?;
        writer.flush().map_err(write_failed)?;
        Ok(())
    }
}

fn rule(f: &mut fmt::Formatter<'_>, left: char, right: char) -> fmt::Result {
    writeln!(f, "{left}{}{right}", "═".repeat(WIDTH))
}

fn row(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    writeln!(f, "║ {label:<19} {value:<48} ║")
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        rule(f, '╔', '╗')?;
        writeln!(f, "║  {:<66}  ║", self.mode)?;
        rule(f, '╠', '╣')?;
        row(f, "Duration:", &format!("{:8.2} seconds", self.duration_seconds))?;
        row(f, "Events Read:", &format!("{:8}", self.events_read))?;
        row(f, "Events Dropped:", &format!("{:8} ({:.2}%)", self.events_dropped, self.drop_rate_percent))?;
        row(f, "Ring Errors:", &format!("{:8}", self.ring_errors))?;
        if let Some(discards) = self.kernel_discards {
            row(f, "Kernel Discards:", &format!("{discards:8}"))?;
        }
        if self.events_printed > 0 {
            row(f, "Events Printed:", &format!("{:8}", self.events_printed))?;
        }
        if self.bytes_written > 0 {
            row(f, "Bytes Written:", &format!("{:8.2} MB", self.bytes_written as f64 / MIB))?;
        }

        rule(f, '╠', '╣')?;
        row(f, "Throughput:", &format!("{:8.0} events/sec", self.events_per_second))?;
        row(f, "Processed:", &format!("{:8.2} MB/sec", self.processed_mb_per_second))?;
        if self.events_printed > 0 {
            row(f, "Print Rate:", &format!("{:8.0} events/sec", self.print_rate))?;
        }
        if self.bytes_written > 0 {
            row(f, "Write Bandwidth:", &format!("{:8.2} MB/sec", self.write_mb_per_second))?;
        }

        rule(f, '╠', '╣')?;
        row(f, "Read Latency p50:", &format!("{:8} µs", self.latency_us.p50))?;
        row(f, "Read Latency p95:", &format!("{:8} µs", self.latency_us.p95))?;
        row(f, "Read Latency p99:", &format!("{:8} µs", self.latency_us.p99))?;
        row(f, "Latency Samples:", &format!("{:8}", self.latency_samples))?;
        if let Some(rss) = self.resident_memory_bytes {
            rule(f, '╠', '╣')?;
            row(f, "Resident Memory:", &format!("{:8.2} MB", rss as f64 / MIB))?;
        }
        rule(f, '╚', '╝')
    }
}
