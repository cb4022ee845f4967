// src/util/mod.rs

//! Small helpers shared across the crate.

use std::collections::BTreeMap;

/// Inserts `key` into `map` if absent, otherwise mutates the existing
/// value in place, then returns a reference to it.
pub fn upsert_with<K, V>(map: &mut BTreeMap<K, V>, key: K, default: impl FnOnce() -> V, mutate: impl FnOnce(&mut V)) -> &V
where
    K: Ord,
{
    let entry = map.entry(key).or_insert_with(default);
    mutate(entry);
    entry
}
