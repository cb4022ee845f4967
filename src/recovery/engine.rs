// src/recovery/engine.rs

//! The eight-phase recovery protocol. Driven entirely by the recovery
//! master over its single connection to the local daemon, addressing every
//! other node via `destnode`. Each phase must complete against every
//! connected node before the next begins; a single node failing a phase
//! aborts the whole recovery, to be retried from R1 on the control loop's
//! next tick. No partial completion is ever left in place.

use crate::client::ControlClient;
use crate::cluster::{DatabaseMap, DbId, Generation, Nid, NodeMap, VnnMap};
use crate::error::{CtdbError, Result};
use tracing::{info, instrument};

/// What a successful recovery produced: the generation and routing map now
/// live on every connected node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryOutcome {
    pub generation: Generation,
    pub vnnmap: VnnMap,
}

fn phase_err(phase: &'static str, node: Nid, e: CtdbError) -> CtdbError {
    CtdbError::RecoveryPhaseFailed {
        phase,
        node,
        reason: e.to_string(),
    }
}

/// Runs phases R1 through R8 against `node_map`'s connected membership,
/// with `local_nid` acting as recovery master. `old_generation` seeds R1's
/// freshness check; `databases` is the recovery master's own view of the
/// attached database set, used to reconcile missing databases in R3.
#[instrument(skip(control, node_map, databases), fields(local_nid))]
pub async fn do_recovery(
    control: &ControlClient,
    node_map: &NodeMap,
    local_nid: Nid,
    old_generation: Generation,
    databases: &DatabaseMap,
) -> Result<RecoveryOutcome> {
    let connected: Vec<Nid> = node_map.connected_nids();

    // R1: stamp a new generation, distinct from the last one observed, so
    // any in-flight RPC stamped with the old generation is unambiguously
    // stale once R7 publishes it.
    let new_generation = stamp_new_generation(old_generation);
    info!(new_generation, "R1: stamped new recovery generation");

    // R2: quiesce. ACTIVE recmode blocks client writes on every node while
    // the protocol runs.
    for &nid in &connected {
        control
            .set_recmode(nid, true)
            .await
            .map_err(|e| phase_err("R2:quiesce", nid, e))?;
    }
    info!("R2: all connected nodes quiesced");

    // R3: database convergence. Every connected node must attach every
    // database the recovery master knows about before records can be
    // collected or distributed.
    for db in databases.as_set() {
        let name = databases_name(control, local_nid, db).await?;
        for &nid in &connected {
            let remote_dbs = control
                .get_dbmap(nid)
                .await
                .map_err(|e| phase_err("R3:convergence", nid, e))?;
            if !remote_dbs.contains(db) {
                control
                    .attach_db(nid, &name, false)
                    .await
                    .map_err(|e| phase_err("R3:convergence", nid, e))?;
            }
        }
    }
    info!("R3: database sets converged across all connected nodes");

    // R4: collect. Pull every node's copy of every database into the
    // recovery master's own local copy, merging by per-record sequence.
    for db in databases.as_set() {
        for &nid in &connected {
            if nid == local_nid {
                continue;
            }
            control
                .copy_db(local_nid, nid, local_nid, db, local_nid)
                .await
                .map_err(|e| phase_err("R4:collect", nid, e))?;
        }
    }
    info!("R4: records collected onto the recovery master");

    // R5: retake ownership. The recovery master becomes data-master for
    // every record in every database, so R6's distribution has a single
    // consistent source of truth.
    for db in databases.as_set() {
        for &nid in &connected {
            control
                .set_dmaster(nid, db, local_nid)
                .await
                .map_err(|e| phase_err("R5:retake", nid, e))?;
        }
    }
    info!("R5: recovery master retook data-mastership of every record");

    // R6: distribute. Push the merged superset back out to every node.
    for db in databases.as_set() {
        for &nid in &connected {
            if nid == local_nid {
                continue;
            }
            control
                .copy_db(nid, local_nid, nid, db, local_nid)
                .await
                .map_err(|e| phase_err("R6:distribute", nid, e))?;
        }
    }
    info!("R6: merged databases distributed to every connected node");

    // R7: new routing map, stamped with the new generation and this
    // recovery's connected membership.
    let new_vnnmap = VnnMap::new(new_generation, connected.clone());
    for &nid in &connected {
        control
            .set_vnnmap(nid, new_vnnmap.clone())
            .await
            .map_err(|e| phase_err("R7:routing", nid, e))?;
    }
    info!(generation = new_generation, "R7: new routing map published");

    // R8: unquiesce. NORMAL recmode resumes client writes.
    for &nid in &connected {
        control
            .set_recmode(nid, false)
            .await
            .map_err(|e| phase_err("R8:unquiesce", nid, e))?;
    }
    info!("R8: all connected nodes unquiesced");

    Ok(RecoveryOutcome {
        generation: new_generation,
        vnnmap: new_vnnmap,
    })
}

/// Picks a generation distinct from the last one observed. The value is
/// opaque and carries no ordering guarantee across recoveries, so a fresh
/// random draw is as correct as an incrementing counter and avoids any
/// implication that generations are comparable.
fn stamp_new_generation(old: Generation) -> Generation {
    loop {
        let candidate = rand::random::<u32>();
        if candidate != old {
            return candidate;
        }
    }
}

async fn databases_name(control: &ControlClient, local_nid: Nid, db: DbId) -> Result<String> {
    control
        .get_dbname(local_nid, db)
        .await
        .map_err(|e| phase_err("R3:convergence", local_nid, e))
}
