// src/test_support/fake_node.rs

//! A fake node daemon: decodes frames off one end of a `tokio::io::duplex`
//! pipe and answers control/call RPCs against a shared [`ClusterRegistry`],
//! the way a real `ctdbd` answers them against on-disk cluster state.

use crate::cluster::{Nid, NodeMap, RecordHeader, VnnMap, CURRENT_NODE};
use crate::net::PeerConnection;
use crate::store::{MemoryStore, TrivialStore};
use crate::wire::{CallBody, ControlRequestBody as Req, ControlResponseBody as Resp, FrameCodec, Opcode, WireBody};
use bytes::Bytes;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_util::codec::Framed;

/// One simulated node's view of the cluster, mutable by recovery RPCs.
pub struct NodeState {
    pub node_map: NodeMap,
    pub vnn_map: VnnMap,
    pub store: Arc<MemoryStore>,
    pub recmode_active: bool,
    pub recmaster: Nid,
}

impl NodeState {
    pub fn new(node_map: NodeMap, vnn_map: VnnMap) -> Self {
        Self {
            node_map,
            vnn_map,
            store: Arc::new(MemoryStore::new()),
            recmode_active: false,
            recmaster: 0,
        }
    }
}

/// Shared cluster state every [`FakeNode`] task reads and mutates, keyed by
/// node id. Standing in for what would otherwise be N independent daemon
/// processes.
#[derive(Default)]
pub struct ClusterRegistry {
    nodes: DashMap<Nid, NodeState>,
}

impl ClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, nid: Nid, state: NodeState) {
        self.nodes.insert(nid, state);
    }

    pub fn store_of(&self, nid: Nid) -> Option<Arc<MemoryStore>> {
        self.nodes.get(&nid).map(|s| s.store.clone())
    }
}

/// Spawns the daemon-side task for node `local_nid` and returns the client
/// end as an ordinary [`PeerConnection`].
pub struct FakeNode;

impl FakeNode {
    pub fn connect(registry: Arc<ClusterRegistry>, local_nid: Nid) -> PeerConnection {
        let (client_end, daemon_end) = tokio::io::duplex(64 * 1024);
        tokio::spawn(daemon_loop(registry, local_nid, daemon_end));
        PeerConnection::from_stream(client_end, local_nid)
    }
}

async fn daemon_loop(registry: Arc<ClusterRegistry>, local_nid: Nid, stream: tokio::io::DuplexStream) {
    let mut framed = Framed::new(stream, FrameCodec);
    while let Some(result) = framed.next().await {
        let Ok(frame) = result else { break };
        let target = if frame.header.destnode == CURRENT_NODE {
            local_nid
        } else {
            frame.header.destnode
        };
        let Some(reply_body) = handle(&registry, target, frame.header.srcnode, frame.body) else {
            continue;
        };
        let reply_op = match reply_body {
            WireBody::ControlResponse(_) => Opcode::ReplyControl,
            WireBody::Call(_) => Opcode::ReplyCall,
            _ => continue,
        };
        let header = crate::wire::Header::new(reply_op, frame.header.reqid, frame.header.srcnode, target);
        let reply = crate::wire::Frame::new(header, reply_body);
        if framed.send(reply).await.is_err() {
            break;
        }
    }
}

fn handle(registry: &ClusterRegistry, target: Nid, requester: Nid, body: WireBody) -> Option<WireBody> {
    match body {
        WireBody::ControlRequest(req) => Some(WireBody::ControlResponse(handle_control(registry, target, req))),
        WireBody::Call(CallBody::Request { db, key, .. }) => {
            Some(WireBody::Call(handle_migration(registry, target, requester, db, &key)))
        }
        _ => None,
    }
}

fn handle_control(registry: &ClusterRegistry, target: Nid, req: Req) -> Resp {
    let Some(mut state) = registry.nodes.get_mut(&target) else {
        return Resp::Status(-1);
    };
    match req {
        Req::GetPnn => Resp::Pnn(target),
        Req::GetNodemap => Resp::Nodemap(state.node_map.clone()),
        Req::GetVnnmap => Resp::Vnnmap(state.vnn_map.clone()),
        Req::SetVnnmap(map) => {
            state.vnn_map = map;
            Resp::Ack
        }
        Req::GetDbmap => Resp::Dbmap(state.store.databases()),
        Req::GetDbname { db } => state.store.db_name(db).map(Resp::Dbname).unwrap_or(Resp::Status(-1)),
        Req::GetDbpath { db } => state.store.db_path(db).map(Resp::Dbpath).unwrap_or(Resp::Status(-1)),
        Req::DbAttach { name, persistent } => Resp::DbHandle {
            db: state.store.attach(&name, persistent),
        },
        Req::CopyDb { src, dst, db, lmaster: _ } => {
            drop(state);
            let (Some(src_store), Some(dst_store)) = (registry.store_of(src), registry.store_of(dst)) else {
                return Resp::Status(-1);
            };
            dst_store.merge(db, src_store.snapshot(db));
            Resp::Ack
        }
        Req::SetDmaster { db, newmaster } => {
            state.store.set_dmaster_all(db, newmaster);
            Resp::Ack
        }
        Req::SetRecmode { active } => {
            state.recmode_active = active;
            Resp::Ack
        }
        Req::GetRecmaster => Resp::RecMaster(state.recmaster),
    }
}

/// Simulates `IMMEDIATE_MIGRATION`: the target daemon hands dmaster of the
/// named record to whichever node asked for it.
fn handle_migration(registry: &ClusterRegistry, target: Nid, requester: Nid, db: u32, key: &Bytes) -> CallBody {
    let Some(state) = registry.nodes.get(&target) else {
        return CallBody::Reply { status: -1 };
    };
    let (mut header, value) = state
        .store
        .fetch(db, key)
        .unwrap_or((RecordHeader::new(target), Bytes::new()));
    header.dmaster = requester;
    state.store.seed(db, key.clone(), header, value);
    CallBody::Reply { status: 0 }
}
