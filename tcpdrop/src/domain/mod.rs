//! Domain model for tcpdrop
//!
//! This module contains core domain types and errors that provide:
//! - Named drop reasons with a total rendering for unknown codes
//! - Structured error handling per failure class

pub mod errors;
pub mod types;

pub use types::DropReason;

pub use errors::{DecodeError, ProbeError, ReportError, SourceError};
