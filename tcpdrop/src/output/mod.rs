//! # Output Pipeline
//!
//! Consumes decoded drop events according to the selected mode.
//!
//! | Sink             | Work per event                                  | Mode                  |
//! |------------------|-------------------------------------------------|-----------------------|
//! | [`DiscardSink`]  | none                                            | `benchmark`           |
//! | [`BusySink`]     | reason lookup, symbol lookup, format, discard   | `busy`                |
//! | [`BufferedSink`] | format and append to a 256KB write buffer       | `terminal`, `file`    |
//!
//! Comparing the modes separates the cost of the ingestion path itself, of
//! formatting, and of I/O.
//!
//! The sink is shared between the ingestion task and the shutdown path as a
//! [`SharedSink`], so the final flush can happen even if the ingestion task is
//! still parked in a read. The lock is only taken for one event or one flush,
//! never across an `.await`.

pub mod sinks;

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tcpdrop_common::DropEvent;

use crate::domain::DropReason;
use crate::metrics::Metrics;
use crate::symbols::SymbolTable;

pub use sinks::{BufferedSink, BusySink, DiscardSink, OUTPUT_BUFFER_SIZE};

/// Consumer of decoded drop events
pub trait OutputSink: Send {
    /// Handle one event
    fn consume(&mut self, event: &DropEvent);

    /// Short label for logs
    fn name(&self) -> &'static str;

    /// Push any buffered output to the underlying writer
    ///
    /// # Errors
    /// Returns the writer's error if buffered output could not be written
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Output sink shared by the ingestion task and the shutdown path
pub type SharedSink = Arc<Mutex<Box<dyn OutputSink>>>;

/// Which sink a mode uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Discard,
    Busy,
    Buffered,
}

/// Wrap a sink for sharing
pub fn shared<S: OutputSink + 'static>(sink: S) -> SharedSink {
    Arc::new(Mutex::new(Box::new(sink)))
}

/// Lock a shared sink
///
/// A panic while holding the lock leaves a sink whose buffer is still worth
/// flushing, so poisoning is ignored.
pub fn lock(sink: &SharedSink) -> MutexGuard<'_, Box<dyn OutputSink>> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build the sink for `kind`; buffered output goes to stdout
#[must_use]
pub fn build_sink(kind: SinkKind, symbols: Arc<SymbolTable>, metrics: Arc<Metrics>) -> SharedSink {
    match kind {
        SinkKind::Discard => shared(DiscardSink),
        SinkKind::Busy => shared(BusySink::new(symbols, metrics)),
        SinkKind::Buffered => shared(BufferedSink::new(io::stdout(), symbols, metrics)),
    }
}

/// Append one event line (with trailing newline) to `out`
///
/// ```text
/// [14:02:11] Drop | PID: 1234   | Reason: NO_SOCKET          | Function: tcp_v4_rcv+0x1a2
/// ```
///
/// # Errors
/// Propagates errors from `out`
pub fn format_line<W: fmt::Write>(
    out: &mut W,
    timestamp: impl fmt::Display,
    event: &DropEvent,
    symbols: &SymbolTable,
) -> fmt::Result {
    writeln!(
        out,
        "[{timestamp}] Drop | PID: {:<6} | Reason: {:<18} | Function: {}",
        event.pid,
        DropReason(event.reason),
        symbols.lookup(event.location),
    )
}
