// src/store/mod.rs

//! The on-disk trivial-database engine is treated as an external black
//! box: a key/value store supporting chain-level locking, fetch, and
//! store. This module defines that contract as a trait plus an in-memory
//! reference implementation used by tests and by the in-process "local
//! daemon" side of the record-lock protocol.

mod memory;

pub use memory::MemoryStore;

use crate::cluster::{DatabaseMap, DbId, Nid, RecordHeader};
use crate::error::Result;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// An exclusive per-chain (per-key) lock. Dropping the guard releases the
/// lock. No suspension point may occur while a guard is held.
#[must_use = "dropping this guard releases the chain lock"]
#[derive(Debug)]
pub struct ChainLockGuard {
    held: Arc<AtomicBool>,
}

impl ChainLockGuard {
    fn acquire(held: Arc<AtomicBool>) -> Self {
        // Single-process reference lock: spin until acquired. Callers never
        // hold a chain lock across an await point, so this never contends
        // across a suspension.
        while held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            std::hint::spin_loop();
        }
        Self { held }
    }
}

impl Drop for ChainLockGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}

/// The black-box store contract: database attach/enumeration, per-chain
/// locking, fetch, and store.
pub trait TrivialStore: Send + Sync {
    /// Attaches to a database by name, creating it if absent. Returns its
    /// id — the `create_db`/`DB_ATTACH` control operation.
    fn attach(&self, name: &str, persistent: bool) -> DbId;

    fn databases(&self) -> DatabaseMap;

    fn db_name(&self, db: DbId) -> Option<String>;

    fn db_path(&self, db: DbId) -> Option<String>;

    fn is_persistent(&self, db: DbId) -> bool;

    /// Acquires the exclusive chain-lock on `key` within `db`.
    fn chain_lock(&self, db: DbId, key: &Bytes) -> ChainLockGuard;

    /// Fetches the current header and value for `key`, if any.
    fn fetch(&self, db: DbId, key: &Bytes) -> Option<(RecordHeader, Bytes)>;

    /// Stores `header`/`value` for `key`. Must be called while holding the
    /// chain-lock returned by [`TrivialStore::chain_lock`] for this key.
    fn store(&self, db: DbId, key: &Bytes, header: RecordHeader, value: Bytes) -> Result<()>;

    /// Reassigns every record in `db` to have `newmaster` as data-master —
    /// the `set_dmaster` control operation.
    fn set_dmaster_all(&self, db: DbId, newmaster: Nid);

    /// A full snapshot of `db`'s records, for the source side of `copy_db`.
    fn snapshot(&self, db: DbId) -> Vec<(Bytes, RecordHeader, Bytes)>;

    /// Merges `records` into `db`, resolving conflicts by the per-record
    /// sequence number (higher wins), for the destination side of
    /// `copy_db`.
    fn merge(&self, db: DbId, records: Vec<(Bytes, RecordHeader, Bytes)>);
}
