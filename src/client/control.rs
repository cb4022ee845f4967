// src/client/control.rs

//! The control RPC surface. Each logical operation is a single `async fn`
//! returning `Result<T>`: awaiting it already *is* the "run the event loop
//! until completion" synchronous convenience form, and its return value
//! already *is* the decoded reply a separate `_recv` call would otherwise
//! hand back — a composable asynchronous value rather than three
//! hand-written entry points per operation. One async method per logical
//! RPC, matching on the expected reply shape.

use crate::cluster::{DatabaseMap, DbId, Nid, NodeMap, VnnMap};
use crate::error::{CtdbError, Result};
use crate::net::PeerConnection;
use crate::wire::{ControlRequestBody as Req, ControlResponseBody as Resp};
use std::time::Duration;

/// Default per-call deadline for control RPCs; 1-2 seconds is typical.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(2);

/// A typed wrapper over a [`PeerConnection`] exposing the control RPC
/// surface the recovery engine and control loop consume.
#[derive(Clone)]
pub struct ControlClient {
    conn: PeerConnection,
    deadline: Duration,
}

impl ControlClient {
    pub fn new(conn: PeerConnection) -> Self {
        Self {
            conn,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(conn: PeerConnection, deadline: Duration) -> Self {
        Self { conn, deadline }
    }

    pub fn connection(&self) -> &PeerConnection {
        &self.conn
    }

    async fn send(&self, destnode: Nid, req: Req) -> Result<Resp> {
        self.conn.control(destnode, req, self.deadline).await
    }

    pub async fn get_pnn(&self, destnode: Nid) -> Result<Nid> {
        match self.send(destnode, Req::GetPnn).await? {
            Resp::Pnn(nid) => Ok(nid),
            other => Err(unexpected("GET_PNN", other)),
        }
    }

    pub async fn get_nodemap(&self, destnode: Nid) -> Result<NodeMap> {
        match self.send(destnode, Req::GetNodemap).await? {
            Resp::Nodemap(map) => Ok(map),
            other => Err(unexpected("GET_NODEMAP", other)),
        }
    }

    pub async fn get_vnnmap(&self, destnode: Nid) -> Result<VnnMap> {
        match self.send(destnode, Req::GetVnnmap).await? {
            Resp::Vnnmap(map) => Ok(map),
            other => Err(unexpected("GET_VNNMAP", other)),
        }
    }

    pub async fn set_vnnmap(&self, destnode: Nid, map: VnnMap) -> Result<()> {
        match self.send(destnode, Req::SetVnnmap(map)).await? {
            Resp::Ack => Ok(()),
            Resp::Status(0) => Ok(()),
            Resp::Status(s) => Err(CtdbError::NonZeroStatus(s)),
            other => Err(unexpected("SET_VNNMAP", other)),
        }
    }

    pub async fn get_dbmap(&self, destnode: Nid) -> Result<DatabaseMap> {
        match self.send(destnode, Req::GetDbmap).await? {
            Resp::Dbmap(map) => Ok(map),
            other => Err(unexpected("GET_DBMAP", other)),
        }
    }

    pub async fn get_dbname(&self, destnode: Nid, db: DbId) -> Result<String> {
        match self.send(destnode, Req::GetDbname { db }).await? {
            Resp::Dbname(name) => Ok(name),
            other => Err(unexpected("GET_DBNAME", other)),
        }
    }

    pub async fn get_dbpath(&self, destnode: Nid, db: DbId) -> Result<String> {
        match self.send(destnode, Req::GetDbpath { db }).await? {
            Resp::Dbpath(path) => Ok(path),
            other => Err(unexpected("GET_DBPATH", other)),
        }
    }

    /// Attaches to (and implicitly creates, if absent) a database by name.
    pub async fn attach_db(&self, destnode: Nid, name: &str, persistent: bool) -> Result<DbId> {
        match self
            .send(
                destnode,
                Req::DbAttach {
                    name: name.to_string(),
                    persistent,
                },
            )
            .await?
        {
            Resp::DbHandle { db } => Ok(db),
            other => Err(unexpected("DB_ATTACH", other)),
        }
    }

    /// `create_db(name)`: creates a non-persistent database by name if
    /// absent.
    pub async fn create_db(&self, destnode: Nid, name: &str) -> Result<DbId> {
        self.attach_db(destnode, name, false).await
    }

    /// Merges `db`'s records from `src` into `dst`, resolving conflicts by
    /// the per-record sequence number.
    pub async fn copy_db(&self, destnode: Nid, src: Nid, dst: Nid, db: DbId, lmaster: Nid) -> Result<()> {
        match self
            .send(destnode, Req::CopyDb { src, dst, db, lmaster })
            .await?
        {
            Resp::Ack => Ok(()),
            Resp::Status(0) => Ok(()),
            Resp::Status(s) => Err(CtdbError::NonZeroStatus(s)),
            other => Err(unexpected("COPY_DB", other)),
        }
    }

    /// Reassigns every record in `db` on `destnode` to have `newmaster` as
    /// data-master.
    pub async fn set_dmaster(&self, destnode: Nid, db: DbId, newmaster: Nid) -> Result<()> {
        match self.send(destnode, Req::SetDmaster { db, newmaster }).await? {
            Resp::Ack => Ok(()),
            Resp::Status(0) => Ok(()),
            Resp::Status(s) => Err(CtdbError::NonZeroStatus(s)),
            other => Err(unexpected("SET_DMASTER", other)),
        }
    }

    /// Sets the node's recovery mode, `ACTIVE` (blocks client writes) or
    /// `NORMAL`.
    pub async fn set_recmode(&self, destnode: Nid, active: bool) -> Result<()> {
        match self.send(destnode, Req::SetRecmode { active }).await? {
            Resp::Ack => Ok(()),
            Resp::Status(0) => Ok(()),
            Resp::Status(s) => Err(CtdbError::NonZeroStatus(s)),
            other => Err(unexpected("SET_RECMODE", other)),
        }
    }

    pub async fn get_recmaster(&self, destnode: Nid) -> Result<Nid> {
        match self.send(destnode, Req::GetRecmaster).await? {
            Resp::RecMaster(nid) => Ok(nid),
            other => Err(unexpected("GET_RECMASTER", other)),
        }
    }
}

fn unexpected(op: &'static str, reply: Resp) -> CtdbError {
    CtdbError::MalformedFrame(format!("unexpected reply to {op}: {reply:?}"))
}
