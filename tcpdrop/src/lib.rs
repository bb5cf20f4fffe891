//! # tcpdrop - eBPF TCP Packet Drop Monitor
//!
//! tcpdrop attaches to the kernel's `skb/kfree_skb` tracepoint, streams one
//! fixed-size record per dropped packet through a BPF ring buffer, resolves
//! the dropping kernel function from `/proc/kallsyms` and reports throughput
//! and read latency.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Kernel network stack                        │
//! │                 kfree_skb(skb, location, reason)                │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ tracepoint
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  eBPF Program (tcpdrop-ebpf)                    │
//! │  • reason <= 1 filtered out                                     │
//! │  • 16-byte DropEvent into EVENTS ring buffer                    │
//! │  • ring full: DISCARDS counter                                  │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ ring buffer records
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      tcpdrop (This Crate)                       │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Ingest     │──▶│    Event     │──▶│    Output    │──▶ stdout
//! │  │ (RingBuf fd) │   │   Decoder    │   │    Sink      │         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │         │                                     │                 │
//! │         ▼                                     ▼                 │
//! │  ┌──────────────┐                     ┌──────────────┐          │
//! │  │   Metrics    │──▶ stderr           │ Symbol Table │          │
//! │  │ (atomics)    │                     │ (kallsyms)   │          │
//! │  └──────────────┘                     └──────────────┘          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`probe`]: load, configure and attach the eBPF program
//! - [`ingest`]: the ingestion loop and the [`ingest::EventSource`] seam
//! - [`event`]: zero-copy record decoding
//! - [`symbols`]: kernel symbol table and address resolution
//! - [`output`]: mode-specific output sinks
//! - [`metrics`]: lock-free counters, latency ring and reports
//! - [`lifecycle`]: shutdown signal and drain
//! - [`cli`]: command-line arguments and modes
//! - [`domain`]: drop reasons and error types
//!
//! ## Modes
//!
//! | Mode        | Output                       | Purpose                       |
//! |-------------|------------------------------|-------------------------------|
//! | `terminal`  | formatted lines to stdout    | watch drops live              |
//! | `file`      | formatted lines to stdout    | capture drops to a file       |
//! | `benchmark` | none, progress every second  | ingestion throughput          |
//! | `busy`      | formatted, then discarded    | formatting cost without I/O   |
//!
//! ## Typical Usage
//!
//! ```bash
//! cargo xtask build-ebpf --release
//! sudo ./target/release/tcpdrop terminal 30
//! sudo ./target/release/tcpdrop benchmark 10 --report bench.json
//! ```

pub mod cli;
pub mod domain;
pub mod event;
pub mod ingest;
pub mod lifecycle;
pub mod metrics;
pub mod output;
pub mod preflight;
pub mod probe;
pub mod symbols;
