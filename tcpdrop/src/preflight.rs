//! Startup checks
//!
//! Loading the drop tracepoint needs root, and the `EVENTS` map needs BPF ring
//! buffer support (Linux 5.8). Checking both first turns what would be an
//! opaque verifier or map-creation error into a message naming the fix.

#![allow(unsafe_code)] // geteuid

use anyhow::{bail, Context, Result};

/// First kernel with `BPF_MAP_TYPE_RINGBUF`
const RINGBUF_KERNEL: (u32, u32) = (5, 8);

const OSRELEASE: &str = "/proc/sys/kernel/osrelease";

/// Checks that must pass before the eBPF object is loaded
///
/// # Errors
/// Returns an error naming the unmet requirement
pub fn run_preflight_checks() -> Result<()> {
    require_root()?;
    require_ringbuf_kernel()?;
    Ok(())
}

fn require_root() -> Result<()> {
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        bail!(
            "Permission denied: attaching to skb/kfree_skb requires root (euid is {euid}).\n\n\
             Usage: sudo tcpdrop <MODE> <DURATION_SECONDS>"
        );
    }
    Ok(())
}

fn require_ringbuf_kernel() -> Result<()> {
    let release = std::fs::read_to_string(OSRELEASE)
        .with_context(|| format!("Failed to read {OSRELEASE}"))?;
    let release = release.trim();

    // Vendor strings we cannot parse are let through; the load reports the real problem
    let Some(version) = parse_release(release) else {
        return Ok(());
    };

    if version < RINGBUF_KERNEL {
        bail!(
            "Linux {release} has no BPF ring buffer; tcpdrop needs {}.{} or newer",
            RINGBUF_KERNEL.0,
            RINGBUF_KERNEL.1
        );
    }
    Ok(())
}

/// `"5.15.0-generic"` -> `(5, 15)`
fn parse_release(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_check_names_the_requirement() {
        // Outcome depends on the host kernel
        if let Err(e) = require_ringbuf_kernel() {
            let msg = e.to_string();
            assert!(msg.contains("ring buffer") || msg.contains(OSRELEASE));
        }
    }

    #[test]
    fn test_parse_release() {
        assert_eq!(parse_release("5.15.0-generic"), Some((5, 15)));
        assert_eq!(parse_release("6.1rc3"), Some((6, 1)));
        assert_eq!(parse_release("6"), None);
        assert_eq!(parse_release("unknown"), None);
    }

    #[test]
    fn test_ringbuf_threshold() {
        assert!(parse_release("5.7.19").unwrap() < RINGBUF_KERNEL);
        assert!(parse_release("5.8.0").unwrap() >= RINGBUF_KERNEL);
        assert!(parse_release("5.10.0-amd64").unwrap() >= RINGBUF_KERNEL);
    }
}
