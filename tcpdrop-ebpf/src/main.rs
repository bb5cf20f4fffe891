//! # eBPF Kernel-Side Instrumentation
//!
//! Tracepoint program that reports packet drops to userspace.
//!
//! ## Programs
//!
//! - **Tracepoint**: `trace_tcp_drop` on `skb/kfree_skb`
//!
//! ## Maps (Shared with Userspace)
//!
//! - `EVENTS` - Ring buffer (64KB) for drop records
//! - `DISCARDS` - Per-CPU counter of records lost to a full ring buffer
//! - `CONFIG` - Tracepoint field offsets (location, reason)
//!
//! ## Build
//!
//! Always compiled in release mode (debug includes incompatible formatting code):
//! ```bash
//! cargo xtask build-ebpf --release
//! ```

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    helpers::bpf_get_current_pid_tgid,
    macros::{map, tracepoint},
    maps::{HashMap, PerCpuArray, RingBuf},
    programs::TracePointContext,
};
use tcpdrop_common::{
    DropEvent, CONFIG_LOCATION_OFFSET, CONFIG_REASON_OFFSET, DEFAULT_LOCATION_OFFSET,
    DEFAULT_REASON_OFFSET, EVENTS_BYTE_SIZE, MAX_SUPPRESSED_REASON,
};

// ============================================================================
// eBPF Maps
// ============================================================================

/// Drop records for userspace. A full buffer drops the record.
#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(EVENTS_BYTE_SIZE, 0);

/// Slot 0 counts records each CPU failed to output
#[map]
static DISCARDS: PerCpuArray<u64> = PerCpuArray::with_max_entries(1, 0);

/// Tracepoint field offsets, written by userspace from the tracepoint format file
#[map]
static CONFIG: HashMap<u32, u64> = HashMap::with_max_entries(16, 0);

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: skb/kfree_skb
/// Fires whenever the kernel frees a socket buffer with a drop reason
#[tracepoint]
pub fn trace_tcp_drop(ctx: TracePointContext) -> u32 {
    match try_trace_tcp_drop(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_trace_tcp_drop(ctx: &TracePointContext) -> Result<(), i64> {
    let reason_offset = config_value(CONFIG_REASON_OFFSET, DEFAULT_REASON_OFFSET);
    let reason: u32 = unsafe { ctx.read_at(reason_offset as usize)? };
    if reason <= MAX_SUPPRESSED_REASON {
        return Ok(());
    }

    let location_offset = config_value(CONFIG_LOCATION_OFFSET, DEFAULT_LOCATION_OFFSET);
    let location: u64 = unsafe { ctx.read_at(location_offset as usize)? };

    let pid = (unsafe { bpf_get_current_pid_tgid() } >> 32) as u32;
    let event = DropEvent { pid, reason, location };

    // Full buffer: the record is lost, only the counter remembers it
    if unsafe { EVENTS.output(&event, 0) }.is_err() {
        count_discard();
    }

    Ok(())
}

fn config_value(key: u32, default: u64) -> u64 {
    unsafe { CONFIG.get(&key).copied().unwrap_or(default) }
}

fn count_discard() {
    if let Some(counter) = DISCARDS.get_ptr_mut(0) {
        unsafe { *counter += 1 };
    }
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 4] = *b"GPL\0";
