//! # Event Ingestion
//!
//! Drives the pipeline: read a record, decode it, count it, hand it to the
//! output sink.
//!
//! ## State Machine
//!
//! ```text
//!            read completes after shutdown              last event dispatched
//! Running ─────────────────────────────────▶ Draining ─────────────────────▶ Stopped
//!    │                                                                         ▲
//!    └────────────── shutdown seen between reads, or source closed ───────────┘
//! ```
//!
//! The shutdown signal is polled between reads, never during one: an
//! in-flight read may still complete and be processed after shutdown was
//! requested. That last event is dispatched in the `Draining` state. The
//! lifecycle coordinator bounds the window with a grace period. The state is
//! published on a [`watch`] channel for observers outside the task.
//!
//! ## Latency
//!
//! The latency recorded per event is the wall time spent inside the read call.
//! It measures how long the consumer waits for the producer, not kernel-to-
//! terminal latency.

pub mod ring_source;

use log::{debug, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::domain::SourceError;
use crate::event::decode;
use crate::lifecycle::{ShutdownCause, ShutdownSignal};
use crate::metrics::Metrics;
use crate::output::{self, SharedSink};

pub use ring_source::RingBufSource;

/// A stream of raw drop records
pub trait EventSource: Send {
    /// Wait for the next record and lend its bytes to `f`
    ///
    /// The bytes are only valid for the duration of `f`; nothing is copied.
    fn read_record<F, R>(&mut self, f: F) -> impl Future<Output = Result<R, SourceError>> + Send
    where
        F: FnOnce(&[u8]) -> R + Send,
        R: Send;
}

/// Ingestion loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Draining,
    Stopped,
}

/// Why the ingestion loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The shutdown signal was observed between reads
    Shutdown,
    /// The event source reported it will produce nothing more
    SourceClosed,
}

/// Reads records from an [`EventSource`] until shutdown or end of stream
pub struct IngestionLoop<S> {
    source: S,
    metrics: Arc<Metrics>,
    sink: SharedSink,
    shutdown: ShutdownSignal,
    state: watch::Sender<LoopState>,
}

impl<S: EventSource> IngestionLoop<S> {
    pub fn new(source: S, metrics: Arc<Metrics>, sink: SharedSink, shutdown: ShutdownSignal) -> Self {
        let (state, _) = watch::channel(LoopState::Running);
        Self { source, metrics, sink, shutdown, state }
    }

    #[must_use]
    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Follow state changes from another task
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    /// Run until shutdown is observed or the source closes
    pub async fn run(&mut self) -> LoopExit {
        let exit = loop {
            if self.shutdown.is_triggered() {
                break LoopExit::Shutdown;
            }

            let metrics = &self.metrics;
            let sink = &self.sink;
            let shutdown = &self.shutdown;
            let state = &self.state;
            let started = Instant::now();

            let result = self
                .source
                .read_record(|raw| {
                    metrics.record_latency(started.elapsed());
                    if shutdown.is_triggered() {
                        state.send_replace(LoopState::Draining);
                    }
                    dispatch(raw, metrics, sink);
                })
                .await;

            match result {
                Ok(()) => {}
                Err(SourceError::Closed) => {
                    info!("Event source closed, stopping ingestion");
                    self.shutdown.trigger(ShutdownCause::SourceClosed);
                    break LoopExit::SourceClosed;
                }
                Err(SourceError::Transient(e)) => {
                    self.metrics.ring_errors.incr();
                    debug!("Ring buffer read failed: {e}");
                }
            }
        };

        self.state.send_replace(LoopState::Stopped);
        debug!("Ingestion stopped: {exit:?}");
        exit
    }
}

/// Decode one record and hand it to the sink
fn dispatch(raw: &[u8], metrics: &Metrics, sink: &SharedSink) {
    match decode(raw) {
        Ok(event) => {
            metrics.events_read.incr();
            metrics.bytes_processed.add(raw.len() as u64);
            output::lock(sink).consume(&event);
        }
        Err(e) => {
            metrics.events_dropped.incr();
            debug!("Dropping record: {e}");
        }
    }
}
