use log::warn;
use std::hint::black_box;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use tcpdrop_common::DropEvent;

use super::{format_line, OutputSink};
use crate::metrics::Metrics;
use crate::symbols::SymbolTable;

/// Write buffer size, large enough to batch thousands of lines per write
pub const OUTPUT_BUFFER_SIZE: usize = 256 * 1024;

fn timestamp() -> impl std::fmt::Display {
    chrono::Local::now().format("%H:%M:%S")
}

/// Does nothing: measures the ingestion path alone
#[derive(Debug, Default)]
pub struct DiscardSink;

impl OutputSink for DiscardSink {
    fn consume(&mut self, _event: &DropEvent) {}

    fn name(&self) -> &'static str {
        "discard"
    }
}

/// Formats every event exactly like [`BufferedSink`], then throws the line away
///
/// Each line is a fresh allocation on purpose: this mode measures the CPU and
/// allocator cost of formatting without any I/O.
pub struct BusySink {
    symbols: Arc<SymbolTable>,
    metrics: Arc<Metrics>,
}

impl BusySink {
    #[must_use]
    pub fn new(symbols: Arc<SymbolTable>, metrics: Arc<Metrics>) -> Self {
        Self { symbols, metrics }
    }
}

impl OutputSink for BusySink {
    fn consume(&mut self, event: &DropEvent) {
        let mut line = String::new();
        if format_line(&mut line, timestamp(), event, &self.symbols).is_ok() {
            black_box(line);
            self.metrics.events_printed.incr();
        }
    }

    fn name(&self) -> &'static str {
        "busy"
    }
}

/// Formats one line per event into a large write buffer
///
/// Output is only guaranteed to reach `W` after [`OutputSink::flush`].
pub struct BufferedSink<W: Write> {
    writer: BufWriter<W>,
    line: String,
    symbols: Arc<SymbolTable>,
    metrics: Arc<Metrics>,
    write_failed: bool,
}

impl<W: Write> BufferedSink<W> {
    pub fn new(inner: W, symbols: Arc<SymbolTable>, metrics: Arc<Metrics>) -> Self {
        Self {
            writer: BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, inner),
            line: String::with_capacity(160),
            symbols,
            metrics,
            write_failed: false,
        }
    }
}

impl<W: Write + Send> OutputSink for BufferedSink<W> {
    fn consume(&mut self, event: &DropEvent) {
        self.line.clear();
        if format_line(&mut self.line, timestamp(), event, &self.symbols).is_err() {
            return;
        }

        match self.writer.write_all(self.line.as_bytes()) {
            Ok(()) => {
                self.metrics.events_printed.incr();
                self.metrics.bytes_written.add(self.line.len() as u64);
            }
            Err(e) => {
                // One warning per run; every later line is still attempted
                if !self.write_failed {
                    warn!("Failed to write event output: {e}");
                    self.write_failed = true;
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "buffered"
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Symbol;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    fn symbols() -> Arc<SymbolTable> {
        Arc::new(SymbolTable::from_symbols(vec![Symbol::new(0x1000, "tcp_v4_rcv")]))
    }

    fn event(pid: u32) -> DropEvent {
        DropEvent { pid, reason: 2, location: 0x1010 }
    }

    #[test]
    fn test_discard_sink_counts_nothing() {
        let mut sink = DiscardSink;
        sink.consume(&event(1));
        assert!(sink.flush().is_ok());
    }

    #[test]
    fn test_busy_sink_formats_without_writing() {
        let metrics = Arc::new(Metrics::new());
        let mut sink = BusySink::new(symbols(), Arc::clone(&metrics));

        for pid in 0..10 {
            sink.consume(&event(pid));
        }

        assert_eq!(metrics.events_printed.get(), 10);
        assert_eq!(metrics.bytes_written.get(), 0);
    }

    #[test]
    fn test_buffered_sink_holds_output_until_flush() {
        let metrics = Arc::new(Metrics::new());
        let out = SharedBuf::default();
        let mut sink = BufferedSink::new(out.clone(), symbols(), Arc::clone(&metrics));

        sink.consume(&event(42));
        sink.consume(&event(43));
        assert!(out.0.lock().unwrap().is_empty());

        sink.flush().unwrap();
        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("PID: 42 "));
        assert!(lines[1].contains("Function: tcp_v4_rcv+0x10"));
        assert_eq!(metrics.events_printed.get(), 2);
        assert_eq!(metrics.bytes_written.get(), text.len() as u64);
    }

    #[test]
    fn test_buffered_sink_write_errors_are_not_counted() {
        let metrics = Arc::new(Metrics::new());
        let mut sink = BufferedSink::new(BrokenPipe, symbols(), Arc::clone(&metrics));
        sink.writer = BufWriter::with_capacity(0, BrokenPipe);

        sink.consume(&event(1));
        sink.consume(&event(2));

        assert!(sink.write_failed);
        assert_eq!(metrics.events_printed.get(), 0);
        assert!(sink.flush().is_err());
    }
}
