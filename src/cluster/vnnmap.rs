// src/cluster/vnnmap.rs

use super::Generation;
use super::nodemap::Nid;
use serde::{Deserialize, Serialize};

/// The routing map, a.k.a. "vnnmap": `(generation, size, sequence<NID>)`
/// describing which nodes are logical-masters for the current epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnnMap {
    pub generation: Generation,
    pub sequence: Vec<Nid>,
}

impl VnnMap {
    pub fn new(generation: Generation, sequence: Vec<Nid>) -> Self {
        Self {
            generation,
            sequence,
        }
    }

    /// Number of logical-masters.
    pub fn size(&self) -> usize {
        self.sequence.len()
    }

    pub fn contains(&self, nid: Nid) -> bool {
        self.sequence.contains(&nid)
    }

    /// Two routing maps agree only if generation, size, and sequence all
    /// match exactly.
    pub fn agrees_with(&self, other: &VnnMap) -> bool {
        self.generation == other.generation && self.sequence == other.sequence
    }
}
