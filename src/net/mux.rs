// src/net/mux.rs

//! The request multiplexer: assigns request ids, correlates replies to
//! in-flight requests, and supports cancellation without disturbing
//! request-id uniqueness. A `DashMap` keyed by request id replaces the
//! intrusive linked-list scan a single-threaded daemon could get away with,
//! giving O(1) match under concurrent callers.

use crate::wire::WireBody;
use dashmap::DashMap;
use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::oneshot;
use tracing::warn;

/// Per-connection request multiplexer.
pub struct RequestMultiplexer {
    next_id: AtomicU32,
    pending: DashMap<u32, oneshot::Sender<WireBody>>,
    /// Ids whose caller cancelled before a reply arrived. A reply for one of
    /// these is consumed silently instead of logged as unknown, so the id
    /// can be safely reused.
    draining: DashSet<u32>,
    lock_held: AtomicBool,
    broken: AtomicBool,
}

impl Default for RequestMultiplexer {
    fn default() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            pending: DashMap::new(),
            draining: DashSet::new(),
            lock_held: AtomicBool::new(false),
            broken: AtomicBool::new(false),
        }
    }
}

impl RequestMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probes the next counter value until one is free among in-flight and
    /// not-yet-reaped requests. A linear scan is fine here since the
    /// pending set is small.
    pub fn alloc_id(&self) -> u32 {
        loop {
            let candidate = self.next_id.fetch_add(1, Ordering::AcqRel);
            if candidate != 0 && !self.pending.contains_key(&candidate) && !self.draining.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Registers `id` as awaiting a reply and returns the receiving half of
    /// its completion channel.
    pub fn register(&self, id: u32) -> oneshot::Receiver<WireBody> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        rx
    }

    /// Matches an incoming reply by request id. If no request is waiting,
    /// logs and discards.
    pub fn complete(&self, id: u32, body: WireBody) {
        if let Some((_, tx)) = self.pending.remove(&id) {
            let _ = tx.send(body);
            return;
        }
        if self.draining.remove(&id).is_some() {
            return;
        }
        warn!(request_id = id, "reply for unknown or already-reaped request id, discarding");
    }

    /// Cancels an in-flight request: the wire exchange is not aborted, but
    /// the reply (when it arrives) is drained and discarded rather than
    /// delivered.
    pub fn cancel(&self, id: u32) {
        if self.pending.remove(&id).is_some() {
            self.draining.insert(id);
        }
    }

    /// At-most-one-lock-per-connection enforcement. Returns `true` if the
    /// lock was acquired.
    pub fn try_acquire_lock(&self) -> bool {
        self.lock_held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release_lock(&self) {
        self.lock_held.store(false, Ordering::Release);
    }

    pub fn lock_is_held(&self) -> bool {
        self.lock_held.load(Ordering::Acquire)
    }

    /// Latches connection breakage and fails every currently-pending
    /// request. Breakage is surfaced on every subsequent call until the
    /// connection is discarded.
    pub fn mark_broken(&self) {
        self.broken.store(true, Ordering::Release);
        self.pending.clear();
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }
}
