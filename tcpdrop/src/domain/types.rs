//! Core domain types

use std::fmt;

/// Kernel `skb_drop_reason` code
///
/// Only the codes relevant to TCP drops are named; every other code renders
/// as `UNKNOWN(<code>)` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DropReason(pub u32);

impl DropReason {
    pub const NOT_SPECIFIED: Self = Self(2);
    pub const NO_SOCKET: Self = Self(3);
    pub const TCP_CSUM: Self = Self(5);
    pub const NETFILTER_DROP: Self = Self(8);
    pub const TCP_LISTEN_OVERFLOW: Self = Self(21);
    pub const TCP_RETRANSMIT: Self = Self(64);

    /// Symbolic name, if this code is one we know
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            2 => Some("NOT_SPECIFIED"),
            3 => Some("NO_SOCKET"),
            5 => Some("TCP_CSUM"),
            8 => Some("NETFILTER_DROP"),
            21 => Some("TCP_LISTEN_OVERFLOW"),
            64 => Some("TCP_RETRANSMIT"),
            _ => None,
        }
    }
}

impl From<u32> for DropReason {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

// Honors width/alignment so callers can pad the column with `{:<18}`
impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.pad(name),
            None => f.pad(&format!("UNKNOWN({})", self.0)),
        }
    }
}
