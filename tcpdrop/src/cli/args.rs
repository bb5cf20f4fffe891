//! CLI argument definitions

use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::output::SinkKind;
use crate::probe::DEFAULT_BPF_OBJECT;
use crate::symbols::DEFAULT_SYMBOL_SOURCE;

#[derive(Parser, Debug)]
#[command(
    name = "tcpdrop",
    version,
    about = "Monitor kernel TCP packet drops via the skb/kfree_skb tracepoint",
    after_help = "\
MODES:
    terminal   Format every drop and write it to stdout (alias: print)
    file       Same as terminal, for stdout redirected to a file
    benchmark  Count events only, report throughput every second
    busy       Format every drop, then discard it (CPU cost without I/O)

EXAMPLES:
    sudo tcpdrop terminal 30                 Watch drops for 30 seconds
    sudo tcpdrop file 60 > drops.log         Capture drops to a file
    sudo tcpdrop benchmark 10 --report r.json"
)]
pub struct Args {
    /// Output mode
    #[arg(value_enum)]
    pub mode: Mode,

    /// Stop after N seconds (0 = until Ctrl+C)
    #[arg(value_name = "DURATION_SECONDS")]
    pub duration: u64,

    /// Kernel symbol source
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SYMBOL_SOURCE)]
    pub symbols: PathBuf,

    /// Compiled eBPF object (ignored when built with the `embedded` feature)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_BPF_OBJECT)]
    pub bpf_object: PathBuf,

    /// Seconds to wait after attaching before counting events
    #[arg(long, value_name = "SECS", default_value = "3")]
    pub warmup: u64,

    /// Milliseconds the ingestion task gets to finish after shutdown
    #[arg(long, value_name = "MS", default_value = "500")]
    pub grace_ms: u64,

    /// Also write the final report as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Auto-stop timer; `None` when the duration is 0
    #[must_use]
    pub fn run_for(&self) -> Option<Duration> {
        (self.duration > 0).then(|| Duration::from_secs(self.duration))
    }

    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    #[must_use]
    pub fn warmup_period(&self) -> Duration {
        Duration::from_secs(self.warmup)
    }
}

/// Output mode, one per output sink variant
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[value(alias = "print")]
    Terminal,
    File,
    Benchmark,
    Busy,
}

impl Mode {
    /// Banner title
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Mode::Terminal => "TERMINAL MODE",
            Mode::File => "FILE MODE",
            Mode::Benchmark => "BENCHMARK MODE",
            Mode::Busy => "BUSY MODE",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Mode::Terminal => "Formatted drops written to the terminal",
            Mode::File => "Formatted drops written to redirected stdout",
            Mode::Benchmark => "Events counted and discarded, no formatting",
            Mode::Busy => "Events formatted and discarded, no I/O",
        }
    }

    #[must_use]
    pub fn sink_kind(self) -> SinkKind {
        match self {
            Mode::Terminal | Mode::File => SinkKind::Buffered,
            Mode::Benchmark => SinkKind::Discard,
            Mode::Busy => SinkKind::Busy,
        }
    }

    /// Whether the once-per-second throughput line runs
    #[must_use]
    pub fn reports_progress(self) -> bool {
        matches!(self, Mode::Benchmark)
    }

    /// Whether stdout must be redirected
    #[must_use]
    pub fn requires_redirect(self) -> bool {
        matches!(self, Mode::File)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Terminal => "terminal",
            Mode::File => "file",
            Mode::Benchmark => "benchmark",
            Mode::Busy => "busy",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_mode_and_duration() {
        let args = Args::try_parse_from(["tcpdrop", "benchmark", "10"]).unwrap();
        assert_eq!(args.mode, Mode::Benchmark);
        assert_eq!(args.run_for(), Some(Duration::from_secs(10)));
        assert_eq!(args.grace_period(), Duration::from_millis(500));
        assert_eq!(args.symbols, PathBuf::from("/proc/kallsyms"));
        assert!(args.report.is_none());
    }

    #[test]
    fn test_print_is_alias_for_terminal() {
        let args = Args::try_parse_from(["tcpdrop", "print", "5"]).unwrap();
        assert_eq!(args.mode, Mode::Terminal);
    }

    #[test]
    fn test_zero_duration_disables_timer() {
        let args = Args::try_parse_from(["tcpdrop", "busy", "0"]).unwrap();
        assert_eq!(args.run_for(), None);
    }

    #[test]
    fn test_duration_is_required_and_numeric() {
        assert!(Args::try_parse_from(["tcpdrop", "terminal"]).is_err());
        assert!(Args::try_parse_from(["tcpdrop", "terminal", "soon"]).is_err());
        assert!(Args::try_parse_from(["tcpdrop", "loud", "5"]).is_err());
    }

    #[test]
    fn test_mode_sinks() {
        assert_eq!(Mode::Terminal.sink_kind(), SinkKind::Buffered);
        assert_eq!(Mode::File.sink_kind(), SinkKind::Buffered);
        assert_eq!(Mode::Benchmark.sink_kind(), SinkKind::Discard);
        assert_eq!(Mode::Busy.sink_kind(), SinkKind::Busy);
        assert!(Mode::Benchmark.reports_progress());
        assert!(!Mode::Busy.reports_progress());
        assert!(Mode::File.requires_redirect());
    }
}
