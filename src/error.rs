// src/error.rs

//! Defines the primary error type for the recovery controller and its
//! client library, and its error taxonomy: transient RPC failure, protocol
//! violation, caller contract violation, local resource exhaustion, and
//! recovery-phase failure.

use thiserror::Error;

/// The main error enum covering every failure mode the controller and the
/// client library can surface: one flat enum, `thiserror`-derived, grouped
/// by subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CtdbError {
    // --- Transient RPC failure: log, abort current iteration, retry next tick. ---
    #[error("RPC to node {0} timed out")]
    Timeout(u32),

    #[error("connection to node {0} refused or unreachable: {1}")]
    ConnectFailed(u32, String),

    // --- Protocol violation: log critical, mark the connection broken. ---
    #[error("connection broken: {0}")]
    ConnectionBroken(String),

    #[error("short or malformed frame: {0}")]
    MalformedFrame(String),

    #[error("reply opcode {reply:?} did not match request opcode {request:?}")]
    UnexpectedReply {
        request: crate::wire::Opcode,
        reply: crate::wire::Opcode,
    },

    #[error("reply for unknown request id {0}")]
    UnknownRequestId(u32),

    // --- Caller contract violation: log, return failure, never crash. ---
    #[error("a record lock is already held on this connection")]
    LockAlreadyHeld,

    #[error("lock handle is stale or already released")]
    StaleLockHandle,

    #[error("writes to a persistent database are not permitted through this path")]
    PersistentWriteRejected,

    // --- Local resource exhaustion: fatal. ---
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    // --- Recovery-phase failure: abort recovery, generation mismatch forces re-entry. ---
    #[error("recovery phase {phase} failed for node {node}: {reason}")]
    RecoveryPhaseFailed {
        phase: &'static str,
        node: u32,
        reason: String,
    },

    #[error("no suitable node found to satisfy the request")]
    NoSuchNode,

    #[error("control RPC returned non-zero status {0}")]
    NonZeroStatus(i32),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CtdbError {
    fn from(e: std::io::Error) -> Self {
        CtdbError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CtdbError>;
