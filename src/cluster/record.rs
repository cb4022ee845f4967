// src/cluster/record.rs

use super::nodemap::Nid;
use serde::{Deserialize, Serialize};

/// An opaque 32-bit tag, chosen freshly at the start of each recovery.
pub type Generation = u32;

/// A monotonic per-record sequence number used to resolve merges during
/// `copy_db`: higher sequence wins.
pub type RecordSeq = u64;

/// The header stored alongside a record's value. Carries at minimum the
/// current data-master for the record and the merge sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub dmaster: Nid,
    pub seq: RecordSeq,
}

impl RecordHeader {
    pub fn new(dmaster: Nid) -> Self {
        Self { dmaster, seq: 0 }
    }

    /// Picks the header that should win a merge: the higher sequence
    /// number wins.
    pub fn merge_winner(a: &Self, b: &Self) -> bool {
        // Returns true if `a` should win over `b`.
        a.seq >= b.seq
    }
}
