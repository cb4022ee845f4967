// src/wire/mod.rs

//! The wire protocol the controller speaks to a local node daemon and to
//! peer daemons. The byte layout is nominally external to the core
//! protocol; this module defines a concrete one — a length-prefixed
//! framing codec over `tokio_util::codec` — so the crate is runnable end
//! to end.

mod body;
mod codec;
mod header;
mod opcode;

pub use body::{CallBody, ControlRequestBody, ControlResponseBody, MessageBody, WireBody};
pub use codec::{Frame, FrameCodec};
pub use header::Header;
pub use opcode::{CallFlags, ControlCode, FunctionId, Opcode};
