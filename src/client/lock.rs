// src/client/lock.rs

//! The record-locking and migration protocol — the most delicate part of
//! the client library. A caller calls
//! [`LockClient::read_record_lock`]; on success it receives a
//! [`LockHandle`] plus the record's current value, and must eventually
//! call [`LockClient::release_lock`] without ever suspending in between.

use crate::cluster::{DbId, Nid, RecordHeader};
use crate::error::{CtdbError, Result};
use crate::net::PeerConnection;
use crate::store::{ChainLockGuard, TrivialStore};
use crate::wire::{CallBody, CallFlags, FunctionId};
use bytes::Bytes;
use once_cell::sync::Lazy;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

/// A process-wide salt mixed into the magic-cookie derivation, drawn once
/// from the OS RNG at first use, so the cookie is deterministic per-key
/// within a process but not predictable across process restarts by code
/// outside this module.
static PROCESS_SALT: Lazy<u64> = Lazy::new(|| {
    let mut buf = [0u8; 8];
    getrandom::fill(&mut buf).expect("OS RNG unavailable");
    u64::from_le_bytes(buf)
});

fn lock_magic(db: DbId, key: &Bytes) -> u64 {
    let mut hasher = DefaultHasher::new();
    PROCESS_SALT.hash(&mut hasher);
    db.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

/// Opaque to callers: the owning database, the key, the live header, and a
/// self-validating magic cookie.
#[derive(Debug)]
pub struct LockHandle {
    db: DbId,
    key: Bytes,
    header: RecordHeader,
    value: Bytes,
    magic: u64,
    guard: Option<ChainLockGuard>,
}

impl LockHandle {
    fn new(db: DbId, key: Bytes, header: RecordHeader, value: Bytes, guard: ChainLockGuard) -> Self {
        let magic = lock_magic(db, &key);
        Self {
            db,
            key,
            header,
            value,
            magic,
            guard: Some(guard),
        }
    }

    pub fn db(&self) -> DbId {
        self.db
    }

    pub fn header(&self) -> RecordHeader {
        self.header
    }

    fn is_valid(&self) -> bool {
        self.magic == lock_magic(self.db, &self.key) && self.guard.is_some()
    }

    /// A handle whose magic has been tampered with is rejected by
    /// `write_record` and `release_lock`.
    #[cfg(any(test, feature = "test-support"))]
    pub fn corrupt_magic_for_test(&mut self) {
        self.magic ^= 1;
    }
}

/// Drives the record-lock + migration protocol against a local store and a
/// connection to the local node daemon.
pub struct LockClient {
    store: Arc<dyn TrivialStore>,
    conn: PeerConnection,
    local_nid: Nid,
    migration_deadline: Duration,
}

impl LockClient {
    pub fn new(store: Arc<dyn TrivialStore>, conn: PeerConnection, local_nid: Nid) -> Self {
        Self {
            store,
            conn,
            local_nid,
            migration_deadline: Duration::from_secs(2),
        }
    }

    /// Fast path, slow path, retry loop.
    pub async fn read_record_lock(&self, db: DbId, key: Bytes) -> Result<LockHandle> {
        if !self.conn.try_acquire_lock() {
            // At most one outstanding lock per connection: reject without
            // enqueuing any RPC.
            return Err(CtdbError::LockAlreadyHeld);
        }

        loop {
            if let Some(handle) = self.try_fast_path(db, &key) {
                return Ok(handle);
            }

            // Slow path: kick off migration and wait for the daemon's reply,
            // then retry the fast path. The retry is unbounded: the local
            // node may become data-master and lose it again before we
            // reacquire the chain-lock.
            let call = CallBody::Request {
                function: FunctionId::NullFunc,
                flags: CallFlags::IMMEDIATE_MIGRATION,
                db,
                key: key.clone(),
            };
            tracing::debug!(db, key = %hex::encode(&key), "requesting migration");
            if let Err(e) = self.conn.call(crate::cluster::CURRENT_NODE, call, self.migration_deadline).await {
                self.conn.release_lock();
                return Err(e);
            }
        }
    }

    /// Attempts the fast path once: chain-lock, fetch, check `dmaster`.
    /// Releases the chain-lock again if this node is not yet data-master.
    fn try_fast_path(&self, db: DbId, key: &Bytes) -> Option<LockHandle> {
        let guard = self.store.chain_lock(db, key);
        match self.store.fetch(db, key) {
            Some((header, value)) if header.dmaster == self.local_nid => {
                Some(LockHandle::new(db, key.clone(), header, value, guard))
            }
            Some(_) => None, // guard dropped here, releasing the chain-lock
            None => {
                // A brand-new record: this node originates it, so it is
                // trivially the data-master.
                let header = RecordHeader::new(self.local_nid);
                Some(LockHandle::new(db, key.clone(), header, Bytes::new(), guard))
            }
        }
    }

    /// Validates the lock, rejects persistent-db writes, optimizes a
    /// no-change write to a no-op.
    pub fn write_record(&self, handle: &mut LockHandle, data: Bytes) -> Result<()> {
        if !handle.is_valid() {
            return Err(CtdbError::StaleLockHandle);
        }
        if self.store.is_persistent(handle.db) {
            return Err(CtdbError::PersistentWriteRejected);
        }
        if handle.value == data {
            return Ok(()); // "no change" write optimized to a no-op.
        }
        handle.header.seq += 1;
        self.store.store(handle.db, &handle.key, handle.header, data.clone())?;
        handle.value = data;
        Ok(())
    }

    /// Verifies the magic, drops the chain-lock, unregisters, and consumes
    /// the handle so it cannot be reused.
    pub fn release_lock(&self, mut handle: LockHandle) -> Result<()> {
        if !handle.is_valid() {
            return Err(CtdbError::StaleLockHandle);
        }
        handle.guard.take(); // drops the ChainLockGuard, releasing the chain-lock
        handle.magic = 0;
        self.conn.release_lock();
        Ok(())
    }
}
