// src/recovery/control_loop.rs

//! The steady-state control loop: once per tick, compare every connected
//! node's view of the node map and routing map; if any two views disagree,
//! run recovery. An RPC failure while polling is not itself divergence: a
//! failed poll degrades the tick to a retry on the next one, while a clean
//! poll that disagrees triggers recovery.

use crate::client::ControlClient;
use crate::cluster::{DatabaseMap, NodeMap, Nid, VnnMap};
use crate::error::Result;
use crate::recovery::engine::{do_recovery, RecoveryOutcome};
use crate::util::upsert_with;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// Whether this node asserts recovery-master status unconditionally, or
/// defers to an externally elected one. `GET_RECMASTER` is wired up
/// regardless, but single-recoverer mode never contests it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryRole {
    /// This node always treats itself as recovery master.
    SoleRecoverer,
    /// This node only runs recovery when `GET_RECMASTER` names it.
    TrustExternalElection,
}

/// The result of one tick's consistency check.
#[derive(Debug)]
pub enum ConsistencyCheckOutcome {
    /// Every connected node's view agreed; nothing to do.
    Converged,
    /// An RPC failed while polling; inconclusive, retry next tick.
    RetryNextTick { node: Nid, reason: String },
    /// Two nodes' views disagreed; recovery is required.
    Diverged(String),
}

/// Tunable pacing for the loop.
#[derive(Debug, Clone)]
pub struct ControlLoopConfig {
    pub tick_interval: Duration,
    pub role: RecoveryRole,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            role: RecoveryRole::SoleRecoverer,
        }
    }
}

/// Runs the steady-state loop forever, ticking at `config.tick_interval`.
/// `local_nid` is this process's own node id; `databases` is refreshed from
/// the local node's own database map each tick, since attaches can happen
/// between recoveries.
pub async fn run(control: &ControlClient, local_nid: Nid, config: &ControlLoopConfig) -> Result<()> {
    let mut generation: u32 = 0;
    let mut retry_streaks: BTreeMap<Nid, u32> = BTreeMap::new();
    let mut interval = tokio::time::interval(config.tick_interval);
    loop {
        interval.tick().await;
        match tick(control, local_nid, generation, config).await {
            Ok(TickResult::Recovered(outcome)) => {
                generation = outcome.generation;
                retry_streaks.clear();
                info!(generation, "recovery completed, resuming steady state");
            }
            Ok(TickResult::Retried { node, reason }) => {
                let streak = upsert_with(&mut retry_streaks, node, || 0, |n| *n += 1);
                if streak % 10 == 1 {
                    warn!(node, reason, streak, "poll failed this tick, deferring to the next one");
                }
            }
            Ok(TickResult::NoOp) => {
                retry_streaks.clear();
            }
            Err(e) => {
                warn!(error = %e, "control loop tick failed fatally");
                return Err(e);
            }
        }
    }
}

enum TickResult {
    NoOp,
    Retried { node: Nid, reason: String },
    Recovered(RecoveryOutcome),
}

/// One iteration of the nine-step check: poll, compare, and recover if
/// divergent. Returns `Some(outcome)` if a recovery ran.
async fn tick(control: &ControlClient, local_nid: Nid, generation: u32, config: &ControlLoopConfig) -> Result<TickResult> {
    if config.role == RecoveryRole::TrustExternalElection {
        match control.get_recmaster(local_nid).await {
            Ok(master) if master != local_nid => return Ok(TickResult::NoOp),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "could not determine recovery master, deferring to next tick");
                return Ok(TickResult::NoOp);
            }
        }
    }

    match check_consistency(control, local_nid).await {
        ConsistencyCheckOutcome::Converged => Ok(TickResult::NoOp),
        ConsistencyCheckOutcome::RetryNextTick { node, reason } => Ok(TickResult::Retried { node, reason }),
        ConsistencyCheckOutcome::Diverged(reason) => {
            warn!(reason, "divergence detected, running recovery");
            let node_map = control.get_nodemap(local_nid).await?;
            let databases = control.get_dbmap(local_nid).await?;
            let outcome = do_recovery(control, &node_map, local_nid, generation, &databases).await?;
            Ok(TickResult::Recovered(outcome))
        }
    }
}

/// Polls this node's own node map, routing map, and database set, checks
/// the local routing map against the local node map (its size must match
/// the connected count, and every connected peer must appear in it), then
/// polls and compares every other connected node's views against them.
/// These local self-checks are what let a single-node cluster — with no
/// peers to compare against — still detect a stale routing map.
pub async fn check_consistency(control: &ControlClient, local_nid: Nid) -> ConsistencyCheckOutcome {
    let local_nodemap = match control.get_nodemap(local_nid).await {
        Ok(m) => m,
        Err(e) => {
            return ConsistencyCheckOutcome::RetryNextTick {
                node: local_nid,
                reason: e.to_string(),
            }
        }
    };
    let local_vnnmap = match control.get_vnnmap(local_nid).await {
        Ok(m) => m,
        Err(e) => {
            return ConsistencyCheckOutcome::RetryNextTick {
                node: local_nid,
                reason: e.to_string(),
            }
        }
    };
    let local_dbmap = match control.get_dbmap(local_nid).await {
        Ok(m) => m,
        Err(e) => {
            return ConsistencyCheckOutcome::RetryNextTick {
                node: local_nid,
                reason: e.to_string(),
            }
        }
    };

    if local_vnnmap.size() != local_nodemap.connected_count() {
        return ConsistencyCheckOutcome::Diverged(format!(
            "local routing map has {} entries but {} nodes are connected",
            local_vnnmap.size(),
            local_nodemap.connected_count()
        ));
    }

    for &peer in local_nodemap.connected_nids().iter().filter(|&&n| n != local_nid) {
        if !local_vnnmap.contains(peer) {
            return ConsistencyCheckOutcome::Diverged(format!(
                "connected node {peer} is missing from the local routing map"
            ));
        }
        match poll_peer(control, peer).await {
            Ok((peer_nodemap, peer_vnnmap, peer_dbmap)) => {
                if let Some(reason) =
                    compare_views(&local_nodemap, &local_vnnmap, &local_dbmap, &peer_nodemap, &peer_vnnmap, &peer_dbmap, peer)
                {
                    return ConsistencyCheckOutcome::Diverged(reason);
                }
            }
            Err(reason) => {
                return ConsistencyCheckOutcome::RetryNextTick { node: peer, reason };
            }
        }
    }

    ConsistencyCheckOutcome::Converged
}

async fn poll_peer(control: &ControlClient, peer: Nid) -> std::result::Result<(NodeMap, VnnMap, DatabaseMap), String> {
    let nodemap = control.get_nodemap(peer).await.map_err(|e| e.to_string())?;
    let vnnmap = control.get_vnnmap(peer).await.map_err(|e| e.to_string())?;
    let dbmap = control.get_dbmap(peer).await.map_err(|e| e.to_string())?;
    Ok((nodemap, vnnmap, dbmap))
}

fn compare_views(
    local_nodemap: &NodeMap,
    local_vnnmap: &VnnMap,
    local_dbmap: &DatabaseMap,
    peer_nodemap: &NodeMap,
    peer_vnnmap: &VnnMap,
    peer_dbmap: &DatabaseMap,
    peer: Nid,
) -> Option<String> {
    if !local_nodemap.agrees_with(peer_nodemap) {
        return Some(format!("node {peer} disagrees on the node map"));
    }
    if !local_vnnmap.agrees_with(peer_vnnmap) {
        return Some(format!("node {peer} disagrees on the routing map"));
    }
    if local_dbmap != peer_dbmap {
        return Some(format!("node {peer} disagrees on the database set"));
    }
    None
}
