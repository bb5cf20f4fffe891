//! # tcpdrop - Main Entry Point
//!
//! Startup is strictly sequential (preflight, symbols, eBPF load and attach,
//! warmup); after that three tasks run until the shutdown signal fires:
//! ingestion, the optional progress reporter and the signal/timer triggers.
//! The final report is printed on every shutdown path.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use std::io::IsTerminal;
use std::sync::Arc;

use tcpdrop::cli::{Args, Mode};
use tcpdrop::ingest::{IngestionLoop, RingBufSource};
use tcpdrop::lifecycle::{drain, spawn_triggers, DrainOutcome, ShutdownSignal};
use tcpdrop::metrics::{join_progress_reporter, spawn_progress_reporter, Metrics, MetricsReport};
use tcpdrop::output::{self, build_sink};
use tcpdrop::preflight::run_preflight_checks;
use tcpdrop::probe::{bump_memlock_rlimit, DropFieldOffsets, DropProbe};
use tcpdrop::symbols::SymbolTable;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    let args = Args::parse();
    init_logger(args.quiet);

    std::process::exit(match run(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

/// `info` by default, `warn` with `--quiet`; `RUST_LOG` overrides both
fn init_logger(quiet: bool) {
    let default = if quiet { LevelFilter::Warn } else { LevelFilter::Info };
    env_logger::Builder::new().filter_level(default).parse_default_env().init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else if msg.contains("usage:") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn print_banner(mode: Mode) {
    eprintln!("╔══════════════════════════════════════════════════════════════════════╗");
    eprintln!("║ tcpdrop v{:<60}║", env!("CARGO_PKG_VERSION"));
    eprintln!("║ {:<69}║", mode.title());
    eprintln!("║ {:<69}║", mode.description());
    eprintln!("╚══════════════════════════════════════════════════════════════════════╝");
}

#[tokio::main]
async fn run(args: Args) -> Result<()> {
    if args.mode.requires_redirect() && std::io::stdout().is_terminal() {
        bail!(
            "file mode writes events to stdout, which is a terminal.\n\n\
             Usage: sudo tcpdrop file {} > drops.log",
            args.duration
        );
    }

    run_preflight_checks()?;

    if !args.quiet {
        print_banner(args.mode);
    }

    let symbols = Arc::new(SymbolTable::load(&args.symbols));

    // Load and attach
    bump_memlock_rlimit();
    let mut probe = DropProbe::load(&args.bpf_object).context("Failed to load eBPF program")?;
    let offsets = DropFieldOffsets::from_kernel().context("Failed to read kfree_skb layout")?;
    probe.configure(offsets)?;
    probe.attach().context("Failed to attach drop tracepoint")?;
    let source = RingBufSource::new(probe.take_events()?)
        .context("Failed to register ring buffer with the runtime")?;

    if !args.warmup_period().is_zero() {
        info!("Warming up for {}s...", args.warmup);
        tokio::time::sleep(args.warmup_period()).await;
    }

    // Counters start after warmup so rates cover the measured window only
    let metrics = Arc::new(Metrics::new());
    let sink = build_sink(args.mode.sink_kind(), Arc::clone(&symbols), Arc::clone(&metrics));
    info!("Mode: {} ({} sink)", args.mode, output::lock(&sink).name());

    let shutdown = ShutdownSignal::new();
    let triggers = spawn_triggers(shutdown.clone(), args.run_for())
        .context("Failed to install signal handlers")?;

    let reporter = args
        .mode
        .reports_progress()
        .then(|| spawn_progress_reporter(Arc::clone(&metrics), shutdown.token()));

    let mut ingestion =
        IngestionLoop::new(source, Arc::clone(&metrics), Arc::clone(&sink), shutdown.clone());
    let ingestion = tokio::spawn(async move { ingestion.run().await });

    match args.run_for() {
        Some(d) => info!("Monitoring for {}s (Ctrl+C to stop early)", d.as_secs()),
        None => info!("Monitoring until Ctrl+C"),
    }

    if let Some(cause) = shutdown.triggered().await {
        info!("Stopping: {cause}");
    }

    match drain(ingestion, &sink, args.grace_period()).await {
        DrainOutcome::Completed(exit) => info!("Ingestion finished: {exit:?}"),
        DrainOutcome::TimedOut => info!("Ingestion abandoned after grace period"),
        DrainOutcome::Failed => warn!("Ingestion task did not finish cleanly"),
    }

    triggers.abort();
    if let Some(reporter) = reporter {
        join_progress_reporter(reporter).await;
    }

    let kernel_discards = match probe.kernel_discards() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Failed to read kernel discard counter: {e}");
            None
        }
    };

    let report = MetricsReport::from_metrics(args.mode.title(), &metrics, metrics.elapsed())
        .with_kernel_discards(kernel_discards);
    eprintln!("{report}");

    if let Some(path) = &args.report {
        report.export_json(path)?;
        info!("✓ Report written to {}", path.display());
    }

    Ok(())
}
