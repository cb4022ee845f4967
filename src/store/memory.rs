// src/store/memory.rs

//! An in-memory reference implementation of [`TrivialStore`], used by tests
//! and by [`crate::test_support::FakeNode`]. `DashMap`-backed shared state,
//! keyed by database then by record key.

use super::{ChainLockGuard, TrivialStore};
use crate::cluster::{DatabaseMap, DbId, Nid, RecordHeader};
use crate::error::Result;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

struct DbEntry {
    name: String,
    persistent: bool,
    records: DashMap<Bytes, (RecordHeader, Bytes)>,
    locks: DashMap<Bytes, Arc<AtomicBool>>,
}

/// An in-memory, single-process trivial-database engine.
#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicU32,
    by_id: DashMap<DbId, DbEntry>,
    by_name: DashMap<String, DbId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/diagnostic convenience: directly seed a record without going
    /// through the lock protocol, used by scenario tests that need to place
    /// a record with a specific `dmaster` before recovery runs.
    pub fn seed(&self, db: DbId, key: impl Into<Bytes>, header: RecordHeader, value: impl Into<Bytes>) {
        if let Some(entry) = self.by_id.get(&db) {
            entry.records.insert(key.into(), (header, value.into()));
        }
    }
}

impl TrivialStore for MemoryStore {
    fn attach(&self, name: &str, persistent: bool) -> DbId {
        if let Some(existing) = self.by_name.get(name) {
            return *existing;
        }
        let id = self.next_id.fetch_add(1, Ordering::AcqRel) + 1;
        self.by_id.insert(
            id,
            DbEntry {
                name: name.to_string(),
                persistent,
                records: DashMap::new(),
                locks: DashMap::new(),
            },
        );
        self.by_name.insert(name.to_string(), id);
        id
    }

    fn databases(&self) -> DatabaseMap {
        DatabaseMap::new(self.by_id.iter().map(|e| *e.key()).collect())
    }

    fn db_name(&self, db: DbId) -> Option<String> {
        self.by_id.get(&db).map(|e| e.name.clone())
    }

    fn db_path(&self, db: DbId) -> Option<String> {
        self.by_id.get(&db).map(|e| format!("/var/lib/ctdbrec/{}.tdb", e.name))
    }

    fn is_persistent(&self, db: DbId) -> bool {
        self.by_id.get(&db).map(|e| e.persistent).unwrap_or(false)
    }

    fn chain_lock(&self, db: DbId, key: &Bytes) -> ChainLockGuard {
        let held = {
            let entry = self
                .by_id
                .get(&db)
                .expect("chain_lock called against an unattached database");
            entry
                .locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AtomicBool::new(false)))
                .clone()
        };
        ChainLockGuard::acquire(held)
    }

    fn fetch(&self, db: DbId, key: &Bytes) -> Option<(RecordHeader, Bytes)> {
        self.by_id.get(&db)?.records.get(key).map(|r| r.value().clone())
    }

    fn store(&self, db: DbId, key: &Bytes, header: RecordHeader, value: Bytes) -> Result<()> {
        let entry = self
            .by_id
            .get(&db)
            .expect("store called against an unattached database");
        entry.records.insert(key.clone(), (header, value));
        Ok(())
    }

    fn set_dmaster_all(&self, db: DbId, newmaster: Nid) {
        if let Some(entry) = self.by_id.get(&db) {
            for mut r in entry.records.iter_mut() {
                r.value_mut().0.dmaster = newmaster;
            }
        }
    }

    fn snapshot(&self, db: DbId) -> Vec<(Bytes, RecordHeader, Bytes)> {
        self.by_id
            .get(&db)
            .map(|e| {
                e.records
                    .iter()
                    .map(|r| (r.key().clone(), r.value().0, r.value().1.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn merge(&self, db: DbId, records: Vec<(Bytes, RecordHeader, Bytes)>) {
        let Some(entry) = self.by_id.get(&db) else {
            return;
        };
        for (key, header, value) in records {
            let should_write = match entry.records.get(&key) {
                Some(existing) => RecordHeader::merge_winner(&header, &existing.0),
                None => true,
            };
            if should_write {
                entry.records.insert(key, (header, value));
            }
        }
    }
}
