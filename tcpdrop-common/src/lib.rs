//! # Shared Data Structures (eBPF ↔ Userspace)
//!
//! Defines the record layout and map contract shared between the kernel-side
//! drop tracepoint and the userspace consumer. All types use `#[repr(C)]` so
//! both sides agree on the byte layout of a ring buffer record.
//!
//! ## Key Types
//!
//! - [`DropEvent`] - Fixed 16-byte record emitted for every reported drop
//!
//! ## Maps
//!
//! - [`EVENTS_MAP`] - Ring buffer carrying [`DropEvent`] records
//! - [`DISCARDS_MAP`] - Per-CPU count of records lost to a full ring buffer
//! - [`CONFIG_MAP`] - Tracepoint field offsets written by userspace

#![no_std]

// ============================================================================
// Map Names
// ============================================================================

/// Ring buffer of [`DropEvent`] records
pub const EVENTS_MAP: &str = "EVENTS";

/// Per-CPU array (one slot) counting reservations that failed because the
/// ring buffer was full
pub const DISCARDS_MAP: &str = "DISCARDS";

/// Hash map `u32 -> u64` of runtime configuration
pub const CONFIG_MAP: &str = "CONFIG";

/// Name of the tracepoint program inside the compiled object
pub const PROGRAM_NAME: &str = "trace_tcp_drop";

/// Ring buffer capacity in bytes (must be a power of two and page aligned)
pub const EVENTS_BYTE_SIZE: u32 = 1 << 16;

// ============================================================================
// Configuration Keys
// ============================================================================

/// `CONFIG` key: byte offset of `location` in the `kfree_skb` tracepoint record
pub const CONFIG_LOCATION_OFFSET: u32 = 0;

/// `CONFIG` key: byte offset of `reason` in the `kfree_skb` tracepoint record
pub const CONFIG_REASON_OFFSET: u32 = 1;

/// Default `location` offset (Linux 5.17+ layout, after the 8-byte common
/// header and `skbaddr`)
pub const DEFAULT_LOCATION_OFFSET: u64 = 16;

/// Default `reason` offset (Linux 5.17 - 6.9 layout)
pub const DEFAULT_REASON_OFFSET: u64 = 28;

// ============================================================================
// Drop Reasons
// ============================================================================

/// Reasons at or below this value are not real drops
/// (`SKB_NOT_DROPPED_YET` and `SKB_CONSUMED`) and are never emitted.
pub const MAX_SUPPRESSED_REASON: u32 = 1;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Drop record sent from the tracepoint to userspace via ring buffer
///
/// **Memory Layout**: `pid` at `[0:4)`, `reason` at `[4:8)`, `location` at
/// `[8:16)`, host endianness, no padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DropEvent {
    /// Process ID (TGID) current when the skb was freed
    ///
    /// Advisory only: drops often happen in softirq context, where this is
    /// whatever task happened to be running.
    pub pid: u32,

    /// Kernel `skb_drop_reason` code
    pub reason: u32,

    /// Kernel virtual address of the code that freed the skb
    pub location: u64,
}

/// Size of a [`DropEvent`] record on the wire
pub const DROP_EVENT_SIZE: usize = core::mem::size_of::<DropEvent>();

const _: () = assert!(DROP_EVENT_SIZE == 16);
