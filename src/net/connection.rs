// src/net/connection.rs

use super::RequestMultiplexer;
use crate::cluster::Nid;
use crate::error::{CtdbError, Result};
use crate::wire::{CallBody, ControlRequestBody, ControlResponseBody, Frame, FrameCodec, Header, MessageBody, Opcode, WireBody};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{error, warn};

/// The single multiplexed connection to the local node daemon. Every
/// control/call RPC the client issues, regardless of which peer it targets,
/// travels over this one stream-socket connection.
#[derive(Clone)]
pub struct PeerConnection {
    local_nid: Nid,
    mux: Arc<RequestMultiplexer>,
    outbound_tx: mpsc::UnboundedSender<Frame>,
    message_txs: Arc<DashMap<u64, mpsc::UnboundedSender<MessageBody>>>,
}

impl PeerConnection {
    /// Connects to the local daemon's domain socket.
    pub async fn connect_unix(path: impl AsRef<Path>, local_nid: Nid) -> Result<Self> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self::from_stream(stream, local_nid))
    }

    /// Wraps an already-established duplex stream. Used directly by tests
    /// against an in-process [`crate::test_support::FakeNode`] via
    /// `tokio::io::duplex`, avoiding the need for a real socket in unit
    /// tests.
    pub fn from_stream<S>(stream: S, local_nid: Nid) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let framed = Framed::new(stream, FrameCodec);
        let (mut sink, mut source) = framed.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();
        let mux = Arc::new(RequestMultiplexer::new());
        let message_txs: Arc<DashMap<u64, mpsc::UnboundedSender<MessageBody>>> = Arc::new(DashMap::new());

        let task_mux = mux.clone();
        let task_message_txs = message_txs.clone();
        tokio::spawn(async move {
            loop {
                if task_mux.lock_is_held() {
                    warn!("record lock held while re-entering the I/O service loop");
                }
                tokio::select! {
                    outgoing = outbound_rx.recv() => {
                        match outgoing {
                            Some(frame) => {
                                if sink.send(frame).await.is_err() {
                                    task_mux.mark_broken();
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    incoming = source.next() => {
                        match incoming {
                            Some(Ok(frame)) => dispatch_incoming(frame, &task_mux, &task_message_txs),
                            Some(Err(e)) => {
                                error!("connection broken while decoding a frame: {e}");
                                task_mux.mark_broken();
                                break;
                            }
                            None => {
                                task_mux.mark_broken();
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self {
            local_nid,
            mux,
            outbound_tx,
            message_txs,
        }
    }

    pub fn local_nid(&self) -> Nid {
        self.local_nid
    }

    pub fn is_broken(&self) -> bool {
        self.mux.is_broken()
    }

    /// Sends a control RPC to `destnode` and awaits its reply, bounded by a
    /// per-call `deadline`.
    pub async fn control(
        &self,
        destnode: Nid,
        body: ControlRequestBody,
        deadline: Duration,
    ) -> Result<ControlResponseBody> {
        let reply = self
            .roundtrip(destnode, Opcode::ReqControl, WireBody::ControlRequest(body), deadline)
            .await?;
        match reply {
            WireBody::ControlResponse(r) => Ok(r),
            other => Err(CtdbError::UnexpectedReply {
                request: Opcode::ReqControl,
                reply: opcode_of(&other),
            }),
        }
    }

    /// Sends a `CALL` RPC and awaits its reply — the vehicle for the
    /// `NULL_FUNC`/`IMMEDIATE_MIGRATION` migration kick.
    pub async fn call(&self, destnode: Nid, body: CallBody, deadline: Duration) -> Result<CallBody> {
        let reply = self
            .roundtrip(destnode, Opcode::ReqCall, WireBody::Call(body), deadline)
            .await?;
        match reply {
            WireBody::Call(r) => Ok(r),
            other => Err(CtdbError::UnexpectedReply {
                request: Opcode::ReqCall,
                reply: opcode_of(&other),
            }),
        }
    }

    async fn roundtrip(&self, destnode: Nid, op: Opcode, body: WireBody, deadline: Duration) -> Result<WireBody> {
        if self.mux.is_broken() {
            return Err(CtdbError::ConnectionBroken("connection previously latched broken".into()));
        }
        let id = self.mux.alloc_id();
        let rx = self.mux.register(id);
        let header = Header::new(op, id, destnode, self.local_nid);

        self.outbound_tx
            .send(Frame::new(header, body))
            .map_err(|_| CtdbError::ConnectionBroken("outbound queue closed".into()))?;

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(_recv_error)) => Err(CtdbError::ConnectionBroken(
                "connection closed before a reply arrived".into(),
            )),
            Err(_elapsed) => {
                self.mux.cancel(id);
                Err(CtdbError::Timeout(destnode))
            }
        }
    }

    /// Registers a handler for unsolicited `REQ_MESSAGE` publishes on a
    /// given service id.
    pub fn register_message_handler(&self, service_id: u64) -> mpsc::UnboundedReceiver<MessageBody> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.message_txs.insert(service_id, tx);
        rx
    }

    pub fn try_acquire_lock(&self) -> bool {
        self.mux.try_acquire_lock()
    }

    pub fn release_lock(&self) {
        self.mux.release_lock();
    }

    pub fn lock_is_held(&self) -> bool {
        self.mux.lock_is_held()
    }
}

fn dispatch_incoming(
    frame: Frame,
    mux: &Arc<RequestMultiplexer>,
    message_txs: &Arc<DashMap<u64, mpsc::UnboundedSender<MessageBody>>>,
) {
    match frame.header.operation {
        Opcode::ReplyControl | Opcode::ReplyCall => {
            mux.complete(frame.header.reqid, frame.body);
        }
        Opcode::ReqMessage => {
            if let WireBody::Message(msg) = frame.body {
                if let Some(handler) = message_txs.get(&msg.service_id) {
                    let _ = handler.send(msg);
                }
            } else {
                warn!("REQ_MESSAGE frame carried a non-message body; dropping");
            }
        }
        Opcode::ReqCall | Opcode::ReqControl => {
            error!("client connection received a request-shaped frame; protocol violation, ignoring");
        }
    }
}

fn opcode_of(body: &WireBody) -> Opcode {
    match body {
        WireBody::Call(_) => Opcode::ReplyCall,
        WireBody::ControlRequest(_) => Opcode::ReqControl,
        WireBody::ControlResponse(_) => Opcode::ReplyControl,
        WireBody::Message(_) => Opcode::ReqMessage,
    }
}
