// src/cluster/mod.rs

//! The data model shared by every peer in the cluster: node identifiers,
//! the node map, the routing map ("vnnmap"), the database map, and the
//! per-record header.

mod dbmap;
mod nodemap;
mod record;
mod vnnmap;

pub use dbmap::{DatabaseMap, DbId};
pub use nodemap::{Nid, NodeEntry, NodeFlags, NodeMap, ANY_MASTER, CURRENT_NODE};
pub use record::{Generation, RecordHeader, RecordSeq};
pub use vnnmap::VnnMap;
