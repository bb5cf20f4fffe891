//! # Shutdown and Drain
//!
//! One fire-once signal, several producers:
//!
//! ```text
//!  SIGINT ──┐
//!  SIGTERM ─┼──▶ ShutdownSignal ──▶ ingestion loop (polled between reads)
//!  timer ───┤                  └──▶ main task: drain, flush, report
//!  source ──┘
//!  closed
//! ```
//!
//! Whichever producer fires first decides the recorded cause; later triggers
//! are no-ops. After the signal fires, [`drain`] gives the ingestion task a
//! bounded grace period to finish its in-flight event, then flushes the
//! output sink whether or not the task finished. A read that is blocked
//! waiting for the kernel has no cancellation point, so at most that one read
//! is abandoned.

use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::ingest::LoopExit;
use crate::output::{self, SharedSink};

/// Default time the ingestion task gets to finish after shutdown
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// What ended the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// SIGINT (Ctrl+C)
    Interrupted,
    /// SIGTERM
    Terminated,
    /// The auto-stop timer expired
    DurationElapsed,
    /// The event source will produce nothing more
    SourceClosed,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ShutdownCause::Interrupted => "interrupted",
            ShutdownCause::Terminated => "terminated",
            ShutdownCause::DurationElapsed => "duration limit reached",
            ShutdownCause::SourceClosed => "event source closed",
        };
        f.write_str(text)
    }
}

/// Fire-once broadcast shutdown signal
///
/// Cheap to clone; all clones observe the same signal.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<ShutdownCause>>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal; returns `false` if it had already fired
    pub fn trigger(&self, cause: ShutdownCause) -> bool {
        let first = self.cause.set(cause).is_ok();
        self.token.cancel();
        if first {
            debug!("Shutdown triggered: {cause}");
        }
        first
    }

    /// Non-blocking check
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the signal fires
    pub async fn triggered(&self) -> Option<ShutdownCause> {
        self.token.cancelled().await;
        self.cause()
    }

    /// The cause recorded by the first trigger
    #[must_use]
    pub fn cause(&self) -> Option<ShutdownCause> {
        self.cause.get().copied()
    }

    /// Token cancelled together with this signal, for helper tasks
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Merge SIGINT, SIGTERM and the auto-stop timer into `shutdown`
///
/// `duration == None` disables the timer. The task ends as soon as the signal
/// fires from any source.
///
/// # Errors
/// Returns an error if the signal handlers cannot be installed
pub fn spawn_triggers(
    shutdown: ShutdownSignal,
    duration: Option<Duration>,
) -> std::io::Result<JoinHandle<()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        let timer = async {
            match duration {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };

        let cause = tokio::select! {
            () = shutdown.token.cancelled() => return,
            _ = interrupt.recv() => ShutdownCause::Interrupted,
            _ = terminate.recv() => ShutdownCause::Terminated,
            () = timer => ShutdownCause::DurationElapsed,
        };

        shutdown.trigger(cause);
    }))
}

/// How the ingestion task ended during drain
#[derive(Debug)]
pub enum DrainOutcome {
    /// The task observed shutdown (or end of stream) within the grace period
    Completed(LoopExit),
    /// The task was still blocked in a read and was aborted
    TimedOut,
    /// The task panicked or was cancelled
    Failed,
}

/// Wait for ingestion to finish, then flush the sink unconditionally
///
/// On timeout the task is aborted and its handle awaited before flushing, so
/// every event counted as printed is in the flushed output.
pub async fn drain(
    mut ingestion: JoinHandle<LoopExit>,
    sink: &SharedSink,
    grace: Duration,
) -> DrainOutcome {
    let outcome = match timeout(grace, &mut ingestion).await {
        Ok(Ok(exit)) => DrainOutcome::Completed(exit),
        Ok(Err(e)) => {
            warn!("Ingestion task failed: {e}");
            DrainOutcome::Failed
        }
        Err(_) => {
            debug!("Ingestion still blocked after {grace:?}, abandoning in-flight read");
            ingestion.abort();
            // An abort only lands between polls; an event dispatched by the
            // current poll must reach the sink before the flush below
            if let Err(e) = ingestion.await {
                if e.is_panic() {
                    warn!("Ingestion task failed: {e}");
                }
            }
            DrainOutcome::TimedOut
        }
    };

    if let Err(e) = output::lock(sink).flush() {
        warn!("Failed to flush event output: {e}");
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_trigger_wins() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());
        assert_eq!(signal.cause(), None);

        assert!(signal.trigger(ShutdownCause::DurationElapsed));
        assert!(!signal.trigger(ShutdownCause::Interrupted));

        assert!(signal.is_triggered());
        assert_eq!(signal.cause(), Some(ShutdownCause::DurationElapsed));
    }

    #[test]
    fn test_clones_share_state() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        clone.trigger(ShutdownCause::Terminated);
        assert!(signal.is_triggered());
        assert!(signal.token().is_cancelled());
        assert_eq!(signal.cause(), Some(ShutdownCause::Terminated));
    }

    #[tokio::test]
    async fn test_timer_fires_signal() {
        let signal = ShutdownSignal::new();
        let handle = spawn_triggers(signal.clone(), Some(Duration::from_millis(20))).unwrap();

        let cause = timeout(Duration::from_secs(2), signal.triggered()).await.unwrap();
        assert_eq!(cause, Some(ShutdownCause::DurationElapsed));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_triggers_task_exits_when_signal_fires_elsewhere() {
        let signal = ShutdownSignal::new();
        let handle = spawn_triggers(signal.clone(), None).unwrap();

        signal.trigger(ShutdownCause::SourceClosed);
        timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(signal.cause(), Some(ShutdownCause::SourceClosed));
    }

    #[test]
    fn test_cause_display() {
        assert_eq!(ShutdownCause::DurationElapsed.to_string(), "duration limit reached");
        assert_eq!(ShutdownCause::Interrupted.to_string(), "interrupted");
    }
}
