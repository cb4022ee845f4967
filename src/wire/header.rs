// src/wire/header.rs

use super::Opcode;
use serde::{Deserialize, Serialize};

/// The fixed header prefixing every frame:
/// `{length, operation, reqid, destnode, srcnode}`.
///
/// `length` is the length in bytes of the opcode-specific body that follows
/// the header on the wire; it is filled in by [`FrameCodec`](super::FrameCodec)
/// at encode time and is not meaningful on a [`Frame`](super::Frame) that
/// has not yet been serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub length: u32,
    pub operation: Opcode,
    pub reqid: u32,
    pub destnode: u32,
    pub srcnode: u32,
}

impl Header {
    pub fn new(operation: Opcode, reqid: u32, destnode: u32, srcnode: u32) -> Self {
        Self {
            length: 0,
            operation,
            reqid,
            destnode,
            srcnode,
        }
    }
}
