// src/wire/codec.rs

//! Frame accumulation for length-prefixed peer messages: a `tokio_util::codec`
//! pair around a length-prefixed wire format — a fixed header plus a
//! `bincode`-encoded, opcode-specific body.

use super::{Header, WireBody};
use crate::error::CtdbError;
use bincode::config::standard;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// A single length-prefixed message: a fixed header plus an opcode-specific
/// body.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: Header,
    pub body: WireBody,
}

impl Frame {
    pub fn new(header: Header, body: WireBody) -> Self {
        Self { header, body }
    }
}

/// Length-prefixed framing: `[u32 total_len][bincode(Header)][bincode(WireBody)]`.
///
/// A `would_block`-style partial-frame condition has no explicit
/// representation here: `tokio_util::codec::Decoder::decode` returning
/// `Ok(None)` means exactly that ("not enough bytes yet, do not treat this
/// as an error"), which is the idiomatic substitute for a hand-rolled
/// `would_block` sentinel.
#[derive(Debug, Default)]
pub struct FrameCodec;

const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;
const LEN_PREFIX_BYTES: usize = 4;

impl Encoder<Frame> for FrameCodec {
    type Error = CtdbError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let header_bytes = bincode::serde::encode_to_vec(&item.header, standard())
            .map_err(|e| CtdbError::MalformedFrame(e.to_string()))?;
        let body_bytes = bincode::serde::encode_to_vec(&item.body, standard())
            .map_err(|e| CtdbError::MalformedFrame(e.to_string()))?;

        let header_len = header_bytes.len() as u32;
        let total_len = (4 + header_bytes.len() + body_bytes.len()) as u32;
        if total_len as usize > MAX_FRAME_BYTES {
            return Err(CtdbError::MalformedFrame(format!(
                "frame of {total_len} bytes exceeds the {MAX_FRAME_BYTES} byte limit"
            )));
        }

        dst.extend_from_slice(&total_len.to_be_bytes());
        dst.extend_from_slice(&header_len.to_be_bytes());
        dst.extend_from_slice(&header_bytes);
        dst.extend_from_slice(&body_bytes);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = CtdbError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LEN_PREFIX_BYTES {
            return Ok(None);
        }

        let total_len = u32::from_be_bytes(src[0..4].try_into().unwrap()) as usize;
        if total_len > MAX_FRAME_BYTES {
            return Err(CtdbError::MalformedFrame(format!(
                "advertised frame length {total_len} exceeds the {MAX_FRAME_BYTES} byte limit"
            )));
        }
        if src.len() < LEN_PREFIX_BYTES + total_len {
            // Not enough bytes yet; a partial frame, not an error.
            src.reserve(LEN_PREFIX_BYTES + total_len - src.len());
            return Ok(None);
        }

        src.advance(LEN_PREFIX_BYTES);
        if total_len < 4 {
            return Err(CtdbError::MalformedFrame("frame shorter than its own header length prefix".into()));
        }
        let header_len = u32::from_be_bytes(src[0..4].try_into().unwrap()) as usize;
        src.advance(4);
        if header_len > total_len - 4 {
            return Err(CtdbError::MalformedFrame(format!(
                "header length {header_len} exceeds frame length {total_len}"
            )));
        }
        let body_len = total_len - 4 - header_len;
        if src.len() < header_len + body_len {
            return Err(CtdbError::MalformedFrame("inconsistent header/body length".into()));
        }

        let header_bytes = src.split_to(header_len);
        let body_bytes = src.split_to(body_len);

        let (header, _): (Header, usize) =
            bincode::serde::decode_from_slice(&header_bytes, standard())
                .map_err(|e| CtdbError::MalformedFrame(e.to_string()))?;
        let (body, _): (WireBody, usize) =
            bincode::serde::decode_from_slice(&body_bytes, standard())
                .map_err(|e| CtdbError::MalformedFrame(e.to_string()))?;

        Ok(Some(Frame::new(header, body)))
    }
}
