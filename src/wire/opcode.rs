// src/wire/opcode.rs

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// The message-level opcode, carried in every [`Header`](super::Header).
///
/// `REQ_CALL`/`REPLY_CALL` carry function calls (only `NULL_FUNC` with
/// `IMMEDIATE_MIGRATION` is used by this crate); `REQ_CONTROL`/
/// `REPLY_CONTROL` carry the control RPC surface consumed by recovery;
/// `REQ_MESSAGE` carries an unsolicited publish to a service id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    ReqCall,
    ReplyCall,
    ReqControl,
    ReplyControl,
    ReqMessage,
}

/// The function id carried in a `REQ_CALL` frame. CTDB defines many; the
/// recovery/lock path only ever dials `NullFunc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionId {
    NullFunc,
}

bitflags! {
    /// Flags carried alongside a `REQ_CALL`. Only `IMMEDIATE_MIGRATION` is
    /// consumed by this crate, to kick off the slow-path migration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CallFlags: u32 {
        const IMMEDIATE_MIGRATION = 1 << 0;
    }
}

/// The control code carried in a `REQ_CONTROL`/`REPLY_CONTROL` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlCode {
    GetPnn,
    GetNodemap,
    GetVnnmap,
    SetVnnmap,
    GetDbmap,
    GetDbname,
    DbAttach,
    DbAttachPersistent,
    GetDbpath,
    CopyDb,
    SetDmaster,
    SetRecmode,
    GetRecmaster,
}
