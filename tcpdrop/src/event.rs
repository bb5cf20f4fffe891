//! # Drop Record Decoding
//!
//! The one place where kernel-origin bytes become a typed value.
//!
//! A ring buffer record is lent to us as `&[u8]`. We check the length first and
//! then copy each field out of a fixed-size sub-array, so nothing is read past
//! the received bytes and no layout assumption is made about the slice's
//! alignment. Fields use host byte order, matching what the kernel wrote.
//!
//! ```text
//! offset  0        4        8                16
//!         +--------+--------+----------------+
//!         |  pid   | reason |    location    |
//!         +--------+--------+----------------+
//! ```

use tcpdrop_common::{DropEvent, DROP_EVENT_SIZE};

use crate::domain::DecodeError;

/// Decode the first 16 bytes of `raw` as a [`DropEvent`]
///
/// Trailing bytes (ring buffer records are 8-byte aligned) are ignored.
///
/// # Errors
/// Returns [`DecodeError::TooSmall`] when fewer than 16 bytes were received.
pub fn decode(raw: &[u8]) -> Result<DropEvent, DecodeError> {
    let Some(record) = raw.first_chunk::<DROP_EVENT_SIZE>() else {
        return Err(DecodeError::TooSmall { len: raw.len(), needed: DROP_EVENT_SIZE });
    };

    let [p0, p1, p2, p3, r0, r1, r2, r3, location @ ..] = *record;

    Ok(DropEvent {
        pid: u32::from_ne_bytes([p0, p1, p2, p3]),
        reason: u32::from_ne_bytes([r0, r1, r2, r3]),
        location: u64::from_ne_bytes(location),
    })
}
