use bytes::Bytes;
use ctdbrec::client::ControlClient;
use ctdbrec::cluster::{NodeEntry, NodeFlags, NodeMap, RecordHeader, VnnMap};
use ctdbrec::recovery::{check_consistency, do_recovery, ConsistencyCheckOutcome};
use ctdbrec::store::TrivialStore;
use ctdbrec::test_support::{ClusterRegistry, FakeNode, NodeState};
use std::sync::Arc;

fn two_node_map() -> NodeMap {
    NodeMap::new(vec![
        NodeEntry { nid: 0, flags: NodeFlags::CONNECTED },
        NodeEntry { nid: 1, flags: NodeFlags::CONNECTED },
    ])
}

#[tokio::test]
async fn generation_skew_is_detected_and_recovery_converges_it() {
    let registry = Arc::new(ClusterRegistry::new());
    registry.insert(0, NodeState::new(two_node_map(), VnnMap::new(1, vec![0, 1])));
    registry.insert(1, NodeState::new(two_node_map(), VnnMap::new(2, vec![0, 1])));

    let conn = FakeNode::connect(registry, 0);
    let control = ControlClient::new(conn);

    match check_consistency(&control, 0).await {
        ConsistencyCheckOutcome::Diverged(reason) => assert!(reason.contains("routing map")),
        other => panic!("expected divergence, got {other:?}"),
    }

    let node_map = control.get_nodemap(0).await.unwrap();
    let databases = control.get_dbmap(0).await.unwrap();
    let outcome = do_recovery(&control, &node_map, 0, 1, &databases).await.unwrap();

    let v0 = control.get_vnnmap(0).await.unwrap();
    let v1 = control.get_vnnmap(1).await.unwrap();
    assert!(v0.agrees_with(&v1));
    assert_eq!(v0.generation, outcome.generation);

    assert!(matches!(check_consistency(&control, 0).await, ConsistencyCheckOutcome::Converged));
}

#[tokio::test]
async fn a_database_missing_on_one_node_is_attached_there_during_recovery() {
    let registry = Arc::new(ClusterRegistry::new());
    registry.insert(0, NodeState::new(two_node_map(), VnnMap::new(1, vec![0, 1])));
    registry.insert(1, NodeState::new(two_node_map(), VnnMap::new(1, vec![0, 1])));

    let conn = FakeNode::connect(registry.clone(), 0);
    let control = ControlClient::new(conn);

    let db = control.create_db(0, "members.tdb").await.unwrap();

    match check_consistency(&control, 0).await {
        ConsistencyCheckOutcome::Diverged(reason) => assert!(reason.contains("database set")),
        other => panic!("expected divergence, got {other:?}"),
    }

    let node_map = control.get_nodemap(0).await.unwrap();
    let databases = control.get_dbmap(0).await.unwrap();
    do_recovery(&control, &node_map, 0, 1, &databases).await.unwrap();

    let node1_dbmap = control.get_dbmap(1).await.unwrap();
    assert!(node1_dbmap.contains(db));
    assert_eq!(control.get_dbname(1, db).await.unwrap(), "members.tdb");
}

#[tokio::test]
async fn recovery_retakes_mastership_and_redistributes_every_record() {
    let registry = Arc::new(ClusterRegistry::new());
    registry.insert(0, NodeState::new(two_node_map(), VnnMap::new(1, vec![0, 1])));
    registry.insert(1, NodeState::new(two_node_map(), VnnMap::new(1, vec![0, 1])));

    let store0 = registry.store_of(0).unwrap();
    let db = store0.attach("members.tdb", false);
    store0.seed(db, Bytes::from_static(b"node-1"), RecordHeader::new(7), Bytes::from_static(b"addr"));

    let conn = FakeNode::connect(registry.clone(), 0);
    let control = ControlClient::new(conn);

    let node_map = control.get_nodemap(0).await.unwrap();
    let databases = control.get_dbmap(0).await.unwrap();
    do_recovery(&control, &node_map, 0, 1, &databases).await.unwrap();

    let store1 = registry.store_of(1).unwrap();
    let (header1, value1) = store1.fetch(db, &Bytes::from_static(b"node-1")).expect("record distributed to node 1");
    assert_eq!(header1.dmaster, 0, "recovery master retains mastership after distribution");
    assert_eq!(value1, Bytes::from_static(b"addr"));
}

#[tokio::test]
async fn a_lone_node_with_a_stale_routing_map_self_heals_without_any_peer() {
    let registry = Arc::new(ClusterRegistry::new());
    let solo_map = NodeMap::new(vec![NodeEntry { nid: 0, flags: NodeFlags::CONNECTED }]);
    registry.insert(0, NodeState::new(solo_map, VnnMap::default()));

    let conn = FakeNode::connect(registry, 0);
    let control = ControlClient::new(conn);

    match check_consistency(&control, 0).await {
        ConsistencyCheckOutcome::Diverged(reason) => assert!(reason.contains("routing map")),
        other => panic!("expected a lone stale node to diverge against itself, got {other:?}"),
    }

    let node_map = control.get_nodemap(0).await.unwrap();
    let databases = control.get_dbmap(0).await.unwrap();
    let outcome = do_recovery(&control, &node_map, 0, 0, &databases).await.unwrap();

    let v0 = control.get_vnnmap(0).await.unwrap();
    assert_eq!(v0.size(), 1);
    assert_eq!(v0.generation, outcome.generation);
    assert!(matches!(check_consistency(&control, 0).await, ConsistencyCheckOutcome::Converged));
}

#[tokio::test]
async fn a_failed_phase_aborts_recovery_without_touching_the_routing_map() {
    let registry = Arc::new(ClusterRegistry::new());
    registry.insert(0, NodeState::new(two_node_map(), VnnMap::new(1, vec![0, 1])));
    // Node 1 is listed as connected but has no daemon behind it: every RPC
    // to it fails, so R2 must abort the whole recovery.

    let conn = FakeNode::connect(registry.clone(), 0);
    let control = ControlClient::new(conn);

    let node_map = control.get_nodemap(0).await.unwrap();
    let databases = control.get_dbmap(0).await.unwrap();
    let err = do_recovery(&control, &node_map, 0, 1, &databases).await.unwrap_err();
    assert!(format!("{err}").contains("R2:quiesce"));

    let v0 = control.get_vnnmap(0).await.unwrap();
    assert_eq!(v0.generation, 1, "routing map is only ever rewritten at R7");
}
