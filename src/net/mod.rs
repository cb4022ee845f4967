// src/net/mod.rs

//! The asynchronous client transport: request multiplexing and the single
//! connection to the local node daemon. Real CTDB clients dial exactly one
//! domain socket (their local `ctdbd`); every RPC names its target via the
//! header's `destnode` field and the local daemon forwards it, so a single
//! multiplexed [`PeerConnection`] is sufficient: one socket, `destnode`
//! selects the target, in the style of a thin async request/response
//! wrapper over a framed socket.

mod connection;
mod mux;

pub use connection::PeerConnection;
pub use mux::RequestMultiplexer;
