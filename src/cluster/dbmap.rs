// src/cluster/dbmap.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A database identifier, unique within the cluster.
pub type DbId = u32;

/// The set of database ids known to a node, carried on the wire as a
/// counted sequence; order is not semantically significant but equality is
/// tested as a set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseMap {
    pub ids: Vec<DbId>,
}

impl DatabaseMap {
    pub fn new(ids: Vec<DbId>) -> Self {
        Self { ids }
    }

    pub fn as_set(&self) -> BTreeSet<DbId> {
        self.ids.iter().copied().collect()
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.ids.contains(&id)
    }

    /// The ids present in `self` but absent from `other`.
    pub fn missing_from(&self, other: &DatabaseMap) -> Vec<DbId> {
        let other_set = other.as_set();
        self.ids
            .iter()
            .copied()
            .filter(|id| !other_set.contains(id))
            .collect()
    }
}

impl PartialEq for DatabaseMap {
    fn eq(&self, other: &Self) -> bool {
        self.as_set() == other.as_set()
    }
}
impl Eq for DatabaseMap {}
