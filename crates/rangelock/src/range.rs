//! Granted byte ranges and the predicates the lock table evaluates over them.
//!
//! A range covers `[offset, offset + length]` with both endpoints inclusive,
//! so two ranges that merely touch (one ends where the other starts) are
//! treated as overlapping. This matches the historical behaviour callers
//! depend on; switching to half-open intervals would let `write(0, 10)` and
//! `write(10, 10)` be held together.

use crate::error::{LockError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of range lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockKind {
    /// Shared lock, overlapping readers allowed.
    Read,
    /// Exclusive lock, no other overlapping holder allowed.
    Write,
}

impl LockKind {
    pub fn from_exclusive(exclusive: bool) -> Self {
        if exclusive {
            LockKind::Write
        } else {
            LockKind::Read
        }
    }

    pub fn is_exclusive(self) -> bool {
        matches!(self, LockKind::Write)
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Read => write!(f, "READ"),
            LockKind::Write => write!(f, "WRITE"),
        }
    }
}

/// One granted lock. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr")]
pub struct Range {
    offset: i64,
    length: i64,
    kind: LockKind,
}

/// Wire shape of [`Range`]; deserialized values go through [`Range::new`].
#[derive(Deserialize)]
struct RangeRepr {
    offset: i64,
    length: i64,
    kind: LockKind,
}

impl TryFrom<RangeRepr> for Range {
    type Error = LockError;

    fn try_from(repr: RangeRepr) -> Result<Self> {
        Range::new(repr.offset, repr.length, repr.kind.is_exclusive())
    }
}

/// Rejects negative offsets, non-positive lengths and ranges whose end does
/// not fit in an `i64`.
pub fn validate(offset: i64, length: i64) -> Result<()> {
    if length <= 0 {
        return Err(LockError::InvalidArgument {
            msg: format!("length must be positive, got {}", length),
        });
    }
    if offset < 0 {
        return Err(LockError::InvalidArgument {
            msg: format!("offset must not be negative, got {}", offset),
        });
    }
    if offset.checked_add(length).is_none() {
        return Err(LockError::InvalidArgument {
            msg: format!("range {}+{} overflows i64", offset, length),
        });
    }
    Ok(())
}

fn within(start: i64, end: i64, value: i64) -> bool {
    start <= value && value <= end
}

impl Range {
    pub fn new(offset: i64, length: i64, exclusive: bool) -> Result<Self> {
        validate(offset, length)?;
        Ok(Self {
            offset,
            length,
            kind: LockKind::from_exclusive(exclusive),
        })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn length(&self) -> i64 {
        self.length
    }

    /// Last byte position covered, inclusive.
    pub fn end(&self) -> i64 {
        self.offset + self.length
    }

    pub fn kind(&self) -> LockKind {
        self.kind
    }

    pub fn is_exclusive(&self) -> bool {
        self.kind.is_exclusive()
    }

    /// True if either range's start falls inside the other, endpoints included.
    pub fn overlaps(&self, other_offset: i64, other_length: i64) -> bool {
        let other_end = other_offset.saturating_add(other_length);
        within(self.offset, self.end(), other_offset) || within(other_offset, other_end, self.offset)
    }

    pub fn matches(&self, offset: i64, length: i64, exclusive: bool) -> bool {
        self.offset == offset && self.length == length && self.is_exclusive() == exclusive
    }

    /// Readers conflict only with overlapping writers; writers conflict with
    /// any overlapping holder.
    pub fn conflicts_with(&self, offset: i64, length: i64, want_exclusive: bool) -> bool {
        self.overlaps(offset, length) && (want_exclusive || self.is_exclusive())
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {}]", self.kind, self.offset, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(offset: i64, length: i64) -> Range {
        Range::new(offset, length, false).unwrap()
    }

    fn write(offset: i64, length: i64) -> Range {
        Range::new(offset, length, true).unwrap()
    }

    #[test]
    fn test_new_rejects_zero_length() {
        let err = Range::new(0, 0, false).unwrap_err();
        assert!(matches!(err, LockError::InvalidArgument { .. }));
    }

    #[test]
    fn test_new_rejects_negative_length() {
        assert!(Range::new(10, -5, true).is_err());
    }

    #[test]
    fn test_new_rejects_negative_offset() {
        let err = Range::new(-1, 10, false).unwrap_err();
        assert!(matches!(err, LockError::InvalidArgument { .. }));
    }

    #[test]
    fn test_new_rejects_overflowing_end() {
        assert!(Range::new(i64::MAX, 1, true).is_err());
        assert!(Range::new(i64::MAX - 1, 1, true).is_ok());
    }

    #[test]
    fn test_accessors() {
        let r = write(100, 50);
        assert_eq!(r.offset(), 100);
        assert_eq!(r.length(), 50);
        assert_eq!(r.end(), 150);
        assert_eq!(r.kind(), LockKind::Write);
        assert!(r.is_exclusive());
        assert!(!read(100, 50).is_exclusive());
    }

    #[test]
    fn test_overlaps_detects_overlap() {
        let r = read(100, 50);
        assert!(r.overlaps(120, 50));
        assert!(r.overlaps(50, 60));
        assert!(r.overlaps(100, 50));
        assert!(r.overlaps(110, 5));
        assert!(r.overlaps(0, 1000));
    }

    #[test]
    fn test_overlaps_non_overlapping() {
        let r = read(100, 50);
        assert!(!r.overlaps(151, 10));
        assert!(!r.overlaps(0, 99));
    }

    #[test]
    fn test_adjacent_ranges_overlap_at_shared_endpoint() {
        let r = write(0, 10);
        assert!(r.overlaps(10, 10));
        assert!(write(10, 10).overlaps(0, 10));
        assert!(!r.overlaps(11, 10));
    }

    #[test]
    fn test_overlaps_is_symmetric() {
        let pairs = [(0, 10, 5, 10), (0, 10, 10, 1), (50, 5, 0, 100), (0, 1, 3, 1)];
        for (o1, l1, o2, l2) in pairs {
            assert_eq!(read(o1, l1).overlaps(o2, l2), read(o2, l2).overlaps(o1, l1));
        }
    }

    #[test]
    fn test_overlaps_saturates_on_huge_other_range() {
        let r = read(i64::MAX - 10, 5);
        assert!(r.overlaps(0, i64::MAX));
    }

    #[test]
    fn test_matches_requires_all_fields() {
        let r = read(100, 50);
        assert!(r.matches(100, 50, false));
        assert!(!r.matches(100, 50, true));
        assert!(!r.matches(100, 51, false));
        assert!(!r.matches(101, 50, false));
    }

    #[test]
    fn test_read_conflicts_only_with_writer() {
        assert!(!read(100, 50).conflicts_with(120, 50, false));
        assert!(write(100, 50).conflicts_with(120, 50, false));
    }

    #[test]
    fn test_write_conflicts_with_any_overlap() {
        assert!(read(100, 50).conflicts_with(120, 50, true));
        assert!(write(100, 50).conflicts_with(120, 50, true));
        assert!(!write(100, 50).conflicts_with(200, 50, true));
    }

    #[test]
    fn test_display() {
        assert_eq!(read(100, 50).to_string(), "READ [100, 150]");
        assert_eq!(write(120, 50).to_string(), "WRITE [120, 170]");
    }

    #[test]
    fn test_serde_json_shape() {
        let json = serde_json::to_string(&write(0, 10)).unwrap();
        assert_eq!(json, r#"{"offset":0,"length":10,"kind":"Write"}"#);
        let back: Range = serde_json::from_str(&json).unwrap();
        assert_eq!(back, write(0, 10));
    }

    #[test]
    fn test_serde_json_rejects_invalid_range() {
        let bad = [
            r#"{"offset":-5,"length":0,"kind":"Write"}"#,
            r#"{"offset":0,"length":-1,"kind":"Read"}"#,
            r#"{"offset":9223372036854775807,"length":1,"kind":"Read"}"#,
        ];
        for json in bad {
            let err = serde_json::from_str::<Range>(json).unwrap_err();
            assert!(err.to_string().contains("Invalid argument"), "{}", err);
        }
    }

    #[test]
    fn test_lock_kind_from_exclusive() {
        assert_eq!(LockKind::from_exclusive(true), LockKind::Write);
        assert_eq!(LockKind::from_exclusive(false), LockKind::Read);
    }
}
