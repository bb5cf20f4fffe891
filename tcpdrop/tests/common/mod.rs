//! Shared test doubles

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tcpdrop::domain::SourceError;
use tcpdrop::ingest::EventSource;

/// One scripted read result
pub enum Step {
    Record(Vec<u8>),
    Fail(io::ErrorKind),
}

/// What the source does once the script runs out
#[derive(Clone, Copy)]
pub enum AfterScript {
    /// Report end of stream
    Close,
    /// Block forever, like a ring buffer nobody writes to
    Hang,
}

/// [`EventSource`] that replays a fixed script
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    after: AfterScript,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = Step>, after: AfterScript) -> Self {
        Self { steps: steps.into_iter().collect(), after }
    }

    pub fn events(count: u32, after: AfterScript) -> Self {
        Self::new((0..count).map(|pid| Step::Record(record(pid, 3, 0x1010))), after)
    }
}

impl EventSource for ScriptedSource {
    fn read_record<F, R>(&mut self, f: F) -> impl Future<Output = Result<R, SourceError>> + Send
    where
        F: FnOnce(&[u8]) -> R + Send,
        R: Send,
    {
        let step = self.steps.pop_front();
        let after = self.after;
        async move {
            match (step, after) {
                (Some(Step::Record(bytes)), _) => Ok(f(&bytes)),
                (Some(Step::Fail(kind)), _) => Err(SourceError::Transient(io::Error::from(kind))),
                (None, AfterScript::Close) => Err(SourceError::Closed),
                (None, AfterScript::Hang) => std::future::pending().await,
            }
        }
    }
}

/// Raw 16-byte record in host byte order
pub fn record(pid: u32, reason: u32, location: u64) -> Vec<u8> {
    let mut raw = Vec::with_capacity(16);
    raw.extend_from_slice(&pid.to_ne_bytes());
    raw.extend_from_slice(&reason.to_ne_bytes());
    raw.extend_from_slice(&location.to_ne_bytes());
    raw
}

/// Writer whose contents stay inspectable after it is moved into a sink
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
