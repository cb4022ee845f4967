// src/cluster/nodemap.rs

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A cluster-wide node identifier (persistent node number / PNN).
pub type Nid = u32;

/// Addresses "the local daemon" in client RPCs.
pub const CURRENT_NODE: Nid = Nid::MAX;

/// Addresses "no specific logical-master" in database-copy operations.
pub const ANY_MASTER: Nid = Nid::MAX - 1;

bitflags! {
    /// Per-node flags. The controller only ever inspects `CONNECTED`; the
    /// remaining bits are carried for wire compatibility and future
    /// extension.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub struct NodeFlags: u32 {
        const CONNECTED    = 1 << 0;
        const BANNED       = 1 << 1;
        const DISABLED     = 1 << 2;
        const STOPPED      = 1 << 3;
        const DELETED      = 1 << 4;
    }
}

/// One entry in a [`NodeMap`]: a node identifier and its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub nid: Nid,
    pub flags: NodeFlags,
}

impl NodeEntry {
    pub fn is_connected(&self) -> bool {
        self.flags.contains(NodeFlags::CONNECTED)
    }
}

/// An ordered sequence of `(NID, flags)` entries. Length and element order
/// are part of the identity peers must agree on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMap {
    pub entries: Vec<NodeEntry>,
}

impl NodeMap {
    pub fn new(entries: Vec<NodeEntry>) -> Self {
        Self { entries }
    }

    /// Nodes with the `CONNECTED` flag set, in their existing order.
    pub fn connected(&self) -> impl Iterator<Item = &NodeEntry> {
        self.entries.iter().filter(|e| e.is_connected())
    }

    pub fn connected_count(&self) -> usize {
        self.connected().count()
    }

    pub fn connected_nids(&self) -> Vec<Nid> {
        self.connected().map(|e| e.nid).collect()
    }

    pub fn contains_connected(&self, nid: Nid) -> bool {
        self.connected().any(|e| e.nid == nid)
    }

    /// Two node maps agree only if they have the same length and the same
    /// entries at every index, in order.
    pub fn agrees_with(&self, other: &NodeMap) -> bool {
        self.entries == other.entries
    }
}
