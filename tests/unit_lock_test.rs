use bytes::Bytes;
use ctdbrec::cluster::{NodeEntry, NodeFlags, NodeMap, RecordHeader, VnnMap};
use ctdbrec::client::LockClient;
use ctdbrec::error::CtdbError;
use ctdbrec::store::TrivialStore;
use ctdbrec::test_support::{ClusterRegistry, FakeNode, NodeState};
use std::sync::Arc;

fn single_node_registry() -> Arc<ClusterRegistry> {
    let registry = Arc::new(ClusterRegistry::new());
    let nodemap = NodeMap::new(vec![NodeEntry {
        nid: 0,
        flags: NodeFlags::CONNECTED,
    }]);
    registry.insert(0, NodeState::new(nodemap, VnnMap::new(1, vec![0])));
    registry
}

#[tokio::test]
async fn a_brand_new_record_is_locked_on_the_fast_path() {
    let registry = single_node_registry();
    let store = registry.store_of(0).unwrap();
    let db = store.attach("members.tdb", false);
    let conn = FakeNode::connect(registry, 0);
    let client = LockClient::new(store, conn, 0);

    let handle = client
        .read_record_lock(db, Bytes::from_static(b"node-1"))
        .await
        .unwrap();
    assert_eq!(handle.header().dmaster, 0);
    client.release_lock(handle).unwrap();
}

#[tokio::test]
async fn a_record_owned_elsewhere_migrates_via_the_slow_path() {
    let registry = single_node_registry();
    let store = registry.store_of(0).unwrap();
    let db = store.attach("members.tdb", false);
    store.seed(db, Bytes::from_static(b"node-1"), RecordHeader::new(99), Bytes::new());

    let conn = FakeNode::connect(registry, 0);
    let client = LockClient::new(store, conn, 0);

    let handle = client
        .read_record_lock(db, Bytes::from_static(b"node-1"))
        .await
        .unwrap();
    assert_eq!(handle.header().dmaster, 0);
    client.release_lock(handle).unwrap();
}

#[tokio::test]
async fn write_record_rejects_persistent_databases() {
    let registry = single_node_registry();
    let store = registry.store_of(0).unwrap();
    let db = store.attach("config.tdb", true);
    let conn = FakeNode::connect(registry, 0);
    let client = LockClient::new(store, conn, 0);

    let mut handle = client
        .read_record_lock(db, Bytes::from_static(b"setting"))
        .await
        .unwrap();
    let err = client.write_record(&mut handle, Bytes::from_static(b"value")).unwrap_err();
    assert_eq!(err, CtdbError::PersistentWriteRejected);
}

#[tokio::test]
async fn write_record_is_a_no_op_when_the_value_is_unchanged() {
    let registry = single_node_registry();
    let store = registry.store_of(0).unwrap();
    let db = store.attach("members.tdb", false);
    let conn = FakeNode::connect(registry, 0);
    let client = LockClient::new(store.clone(), conn, 0);

    let mut handle = client
        .read_record_lock(db, Bytes::from_static(b"node-1"))
        .await
        .unwrap();
    client.write_record(&mut handle, Bytes::new()).unwrap();
    let seq_before = handle.header().seq;
    client.write_record(&mut handle, Bytes::new()).unwrap();
    assert_eq!(handle.header().seq, seq_before, "unchanged value must not bump seq");
}

#[tokio::test]
async fn a_second_lock_on_the_same_connection_is_rejected_without_any_rpc() {
    let registry = single_node_registry();
    let store = registry.store_of(0).unwrap();
    let db = store.attach("members.tdb", false);
    let conn = FakeNode::connect(registry, 0);
    let client = LockClient::new(store, conn, 0);

    let _first = client
        .read_record_lock(db, Bytes::from_static(b"node-1"))
        .await
        .unwrap();
    let err = client
        .read_record_lock(db, Bytes::from_static(b"node-2"))
        .await
        .unwrap_err();
    assert_eq!(err, CtdbError::LockAlreadyHeld);
}

#[tokio::test]
async fn a_tampered_handle_is_rejected_by_write_and_release() {
    let registry = single_node_registry();
    let store = registry.store_of(0).unwrap();
    let db = store.attach("members.tdb", false);
    let conn = FakeNode::connect(registry, 0);
    let client = LockClient::new(store, conn, 0);

    let mut handle = client
        .read_record_lock(db, Bytes::from_static(b"node-1"))
        .await
        .unwrap();
    handle.corrupt_magic_for_test();

    let write_err = client.write_record(&mut handle, Bytes::from_static(b"x")).unwrap_err();
    assert_eq!(write_err, CtdbError::StaleLockHandle);
    let release_err = client.release_lock(handle).unwrap_err();
    assert_eq!(release_err, CtdbError::StaleLockHandle);
}
