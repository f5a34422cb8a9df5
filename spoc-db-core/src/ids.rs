//! Term identifier newtype.
//!
//! A `TermId` is an opaque 64-bit handle for an RDF value. The high word is the
//! partition id of the index partition that minted it and the low word is that
//! partition's local counter. `0` is reserved as the null identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TermId
// ---------------------------------------------------------------------------

/// Term dictionary ID (u64). Ordered, dense, never reused.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct TermId(pub u64);

impl TermId {
    /// The reserved "no identifier" value.
    pub const NULL: TermId = TermId(0);

    /// Largest identifier; upper sentinel for range bounds.
    pub const MAX: TermId = TermId(u64::MAX);

    #[inline]
    pub fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Partition id (high word).
    #[inline]
    pub fn partition_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Partition-local counter (low word).
    #[inline]
    pub fn local_counter(self) -> u32 {
        self.0 as u32
    }

    /// Combine a partition id and a local counter into an identifier.
    #[inline]
    pub fn combine(partition_id: u32, local_counter: u32) -> Self {
        Self(((partition_id as u64) << 32) | local_counter as u64)
    }

    /// `None` for the null identifier.
    #[inline]
    pub fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u64> for TermId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("TermId(NULL)")
        } else {
            write!(f, "TermId({})", self.0)
        }
    }
}
