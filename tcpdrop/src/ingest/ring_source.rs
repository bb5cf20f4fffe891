//! [`EventSource`] backed by the kernel ring buffer
//!
//! The ring buffer's file descriptor is registered with tokio's reactor; the
//! readiness wait is the only place the ingestion task suspends. Records are
//! consumed in place and released back to the kernel when the borrow ends.

use aya::maps::{MapData, RingBuf};
use std::future::Future;
use tokio::io::unix::AsyncFd;

use super::EventSource;
use crate::domain::SourceError;

pub struct RingBufSource {
    inner: AsyncFd<RingBuf<MapData>>,
}

impl RingBufSource {
    /// Register the ring buffer with the tokio reactor
    ///
    /// # Errors
    /// Returns an error if the descriptor cannot be registered (e.g. called
    /// outside a runtime)
    pub fn new(ring_buf: RingBuf<MapData>) -> std::io::Result<Self> {
        Ok(Self { inner: AsyncFd::new(ring_buf)? })
    }
}

impl EventSource for RingBufSource {
    fn read_record<F, R>(&mut self, f: F) -> impl Future<Output = Result<R, SourceError>> + Send
    where
        F: FnOnce(&[u8]) -> R + Send,
        R: Send,
    {
        async move {
            loop {
                // The reactor only fails here once it is gone; nothing more will arrive
                let mut guard = self.inner.readable_mut().await.map_err(|_| SourceError::Closed)?;

                if let Some(item) = guard.get_inner_mut().next() {
                    return Ok(f(&item));
                }

                // Drained: wait for the kernel to signal new data
                guard.clear_ready();
            }
        }
    }
}
