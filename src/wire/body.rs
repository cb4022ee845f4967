// src/wire/body.rs

//! Opcode-specific frame bodies. A [`Header`](super::Header) names which of
//! these a given frame carries; the recipient decodes the matching variant.

use super::opcode::{CallFlags, ControlCode, FunctionId};
use crate::cluster::{DatabaseMap, Nid, NodeMap, RecordSeq, VnnMap};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The body of a `REQ_CALL`/`REPLY_CALL` frame. The recovery/lock path only
/// ever issues `NULL_FUNC` with `IMMEDIATE_MIGRATION`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallBody {
    Request {
        function: FunctionId,
        flags: CallFlags,
        db: u32,
        key: Bytes,
    },
    Reply {
        status: i32,
    },
}

/// The body of a `REQ_CONTROL` frame, one variant per control code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControlRequestBody {
    GetPnn,
    GetNodemap,
    GetVnnmap,
    SetVnnmap(VnnMap),
    GetDbmap,
    GetDbname { db: u32 },
    DbAttach { name: String, persistent: bool },
    GetDbpath { db: u32 },
    CopyDb { src: Nid, dst: Nid, db: u32, lmaster: Nid },
    SetDmaster { db: u32, newmaster: Nid },
    SetRecmode { active: bool },
    GetRecmaster,
}

impl ControlRequestBody {
    pub fn code(&self) -> ControlCode {
        match self {
            ControlRequestBody::GetPnn => ControlCode::GetPnn,
            ControlRequestBody::GetNodemap => ControlCode::GetNodemap,
            ControlRequestBody::GetVnnmap => ControlCode::GetVnnmap,
            ControlRequestBody::SetVnnmap(_) => ControlCode::SetVnnmap,
            ControlRequestBody::GetDbmap => ControlCode::GetDbmap,
            ControlRequestBody::GetDbname { .. } => ControlCode::GetDbname,
            ControlRequestBody::DbAttach { persistent, .. } => {
                if *persistent {
                    ControlCode::DbAttachPersistent
                } else {
                    ControlCode::DbAttach
                }
            }
            ControlRequestBody::GetDbpath { .. } => ControlCode::GetDbpath,
            ControlRequestBody::CopyDb { .. } => ControlCode::CopyDb,
            ControlRequestBody::SetDmaster { .. } => ControlCode::SetDmaster,
            ControlRequestBody::SetRecmode { .. } => ControlCode::SetRecmode,
            ControlRequestBody::GetRecmaster => ControlCode::GetRecmaster,
        }
    }
}

/// The body of a `REPLY_CONTROL` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControlResponseBody {
    Pnn(Nid),
    Nodemap(NodeMap),
    Vnnmap(VnnMap),
    Ack,
    Dbmap(DatabaseMap),
    Dbname(String),
    DbHandle { db: u32 },
    Dbpath(String),
    RecMaster(Nid),
    Status(i32),
}

/// The body of an unsolicited `REQ_MESSAGE` publish, addressed by service id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub service_id: u64,
    pub payload: Bytes,
    pub seq_hint: Option<RecordSeq>,
}

/// The top-level tagged body every frame carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireBody {
    Call(CallBody),
    ControlRequest(ControlRequestBody),
    ControlResponse(ControlResponseBody),
    Message(MessageBody),
}
