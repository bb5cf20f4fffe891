//! Tracepoint format parsing
//!
//! The byte layout of `skb/kfree_skb` changed across kernel versions (the
//! `reason` field appeared in 5.17, `rx_sk` was inserted before it in 6.10).
//! Instead of hard-coding one layout, the offsets are read from the
//! tracepoint's format description:
//!
//! ```text
//! name: kfree_skb
//! ID: 1483
//! format:
//!         field:unsigned short common_type;       offset:0;       size:2; signed:0;
//!         ...
//!         field:void * skbaddr;   offset:8;       size:8; signed:0;
//!         field:void * location;  offset:16;      size:8; signed:0;
//!         field:unsigned short protocol;  offset:24;      size:2; signed:0;
//!         field:enum skb_drop_reason reason;      offset:28;      size:4; signed:0;
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use crate::domain::ProbeError;

/// Format files, tracefs first
pub const KFREE_SKB_FORMAT_PATHS: [&str; 2] = [
    "/sys/kernel/tracing/events/skb/kfree_skb/format",
    "/sys/kernel/debug/tracing/events/skb/kfree_skb/format",
];

/// Position of one field inside a tracepoint record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub offset: u64,
    pub size: u64,
}

/// Parse `field:<decl> <name>; offset:<n>; size:<n>;` lines into a name → layout map
///
/// Lines that do not describe a field are ignored.
#[must_use]
pub fn parse_format(text: &str) -> HashMap<String, FieldLayout> {
    let mut fields = HashMap::new();

    for line in text.lines() {
        let mut decl = None;
        let mut offset = None;
        let mut size = None;

        for part in line.split(';').map(str::trim) {
            if let Some(rest) = part.strip_prefix("field:") {
                decl = Some(rest);
            } else if let Some(rest) = part.strip_prefix("offset:") {
                offset = rest.parse().ok();
            } else if let Some(rest) = part.strip_prefix("size:") {
                size = rest.parse().ok();
            }
        }

        if let (Some(decl), Some(offset), Some(size)) = (decl, offset, size) {
            if let Some(name) = field_name(decl) {
                fields.insert(name.to_string(), FieldLayout { offset, size });
            }
        }
    }

    fields
}

/// Last identifier of a C declaration: `void * location` → `location`,
/// `char comm[16]` → `comm`
fn field_name(decl: &str) -> Option<&str> {
    let last = decl.split_whitespace().last()?;
    let name = last.split('[').next()?.trim_start_matches('*');
    (!name.is_empty()).then_some(name)
}

/// Byte offsets of the fields the kernel program reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropFieldOffsets {
    pub location: u64,
    pub reason: u64,
}

impl DropFieldOffsets {
    /// Extract the `location` and `reason` offsets from a format description
    ///
    /// # Errors
    /// Returns [`ProbeError::FieldMissing`] if either field is absent
    pub fn from_format(text: &str) -> Result<Self, ProbeError> {
        let fields = parse_format(text);
        let location = fields.get("location").ok_or(ProbeError::FieldMissing("location"))?;
        let reason = fields.get("reason").ok_or(ProbeError::FieldMissing("reason"))?;
        Ok(Self { location: location.offset, reason: reason.offset })
    }

    /// Read the offsets from the running kernel's tracefs
    ///
    /// # Errors
    /// Returns an error if no format file is readable or a field is missing
    pub fn from_kernel() -> Result<Self, ProbeError> {
        for path in KFREE_SKB_FORMAT_PATHS {
            if let Ok(text) = std::fs::read_to_string(path) {
                return Self::from_format(&text);
            }
        }
        Err(ProbeError::FormatUnavailable {
            tried: KFREE_SKB_FORMAT_PATHS.iter().map(PathBuf::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT_6_1: &str = "\
name: kfree_skb
ID: 1483
format:
\tfield:unsigned short common_type;\toffset:0;\tsize:2;\tsigned:0;
\tfield:unsigned char common_flags;\toffset:2;\tsize:1;\tsigned:0;
\tfield:unsigned char common_preempt_count;\toffset:3;\tsize:1;\tsigned:0;
\tfield:int common_pid;\toffset:4;\tsize:4;\tsigned:1;

\tfield:void * skbaddr;\toffset:8;\tsize:8;\tsigned:0;
\tfield:void * location;\toffset:16;\tsize:8;\tsigned:0;
\tfield:unsigned short protocol;\toffset:24;\tsize:2;\tsigned:0;
\tfield:enum skb_drop_reason reason;\toffset:28;\tsize:4;\tsigned:0;

print fmt: \"skbaddr=%p protocol=%u location=%pS reason: %s\"
";

    const FORMAT_6_12: &str = "\
format:
\tfield:void * skbaddr;\toffset:8;\tsize:8;\tsigned:0;
\tfield:void * location;\toffset:16;\tsize:8;\tsigned:0;
\tfield:void * rx_sk;\toffset:24;\tsize:8;\tsigned:0;
\tfield:unsigned short protocol;\toffset:32;\tsize:2;\tsigned:0;
\tfield:enum skb_drop_reason reason;\toffset:36;\tsize:4;\tsigned:0;
";

    #[test]
    fn test_parse_fields() {
        let fields = parse_format(FORMAT_6_1);
        assert_eq!(fields["common_pid"], FieldLayout { offset: 4, size: 4 });
        assert_eq!(fields["location"], FieldLayout { offset: 16, size: 8 });
        assert_eq!(fields["reason"], FieldLayout { offset: 28, size: 4 });
        assert!(!fields.contains_key("print fmt"));
    }

    #[test]
    fn test_offsets_follow_kernel_layout() {
        let old = DropFieldOffsets::from_format(FORMAT_6_1).unwrap();
        assert_eq!(old, DropFieldOffsets { location: 16, reason: 28 });

        let new = DropFieldOffsets::from_format(FORMAT_6_12).unwrap();
        assert_eq!(new, DropFieldOffsets { location: 16, reason: 36 });
    }

    #[test]
    fn test_missing_reason_field() {
        let pre_5_17 = "\tfield:void * location;\toffset:16;\tsize:8;\tsigned:0;\n";
        let err = DropFieldOffsets::from_format(pre_5_17).unwrap_err();
        assert!(matches!(err, ProbeError::FieldMissing("reason")));
    }

    #[test]
    fn test_field_name_variants() {
        assert_eq!(field_name("void * location"), Some("location"));
        assert_eq!(field_name("char comm[16]"), Some("comm"));
        assert_eq!(field_name("void *ptr"), Some("ptr"));
        assert_eq!(field_name(""), None);
    }
}
