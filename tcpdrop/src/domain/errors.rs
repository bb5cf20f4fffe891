//! Structured error types for tcpdrop
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

/// A ring buffer record that cannot be turned into a `DropEvent`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Record too small: {len} bytes, expected at least {needed}")]
    TooSmall { len: usize, needed: usize },
}

/// Failure to obtain the next record from an event source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source will never produce another record
    #[error("Event source closed")]
    Closed,

    /// This read failed but later reads may succeed
    #[error("Transient read error: {0}")]
    Transient(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to load eBPF program: {0}")]
    EbpfLoadFailed(String),

    #[error("eBPF map {0} not found")]
    MapNotFound(&'static str),

    #[error("eBPF program {0} not found")]
    ProgramNotFound(&'static str),

    #[error("Failed to attach {program} to {category}/{name}: {error}")]
    AttachFailed { program: String, category: String, name: String, error: String },

    #[error("Tracepoint format unavailable (tried {})", join_paths(.tried))]
    FormatUnavailable { tried: Vec<PathBuf> },

    #[error("Tracepoint field {0} missing (kernel too old for drop reasons?)")]
    FieldMissing(&'static str),

    #[error(transparent)]
    Aya(#[from] aya::EbpfError),

    #[error(transparent)]
    Map(#[from] aya::maps::MapError),

    #[error(transparent)]
    Program(#[from] aya::programs::ProgramError),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report to {path}: {source}")]
    WriteFailed { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
