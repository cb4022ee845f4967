use ctdbrec::cluster::{DatabaseMap, NodeEntry, NodeFlags, NodeMap, RecordHeader, VnnMap};

#[test]
fn nodemaps_agree_only_with_identical_entries_in_order() {
    let a = NodeMap::new(vec![
        NodeEntry { nid: 0, flags: NodeFlags::CONNECTED },
        NodeEntry { nid: 1, flags: NodeFlags::CONNECTED },
    ]);
    let b = NodeMap::new(vec![
        NodeEntry { nid: 0, flags: NodeFlags::CONNECTED },
        NodeEntry { nid: 1, flags: NodeFlags::CONNECTED },
    ]);
    assert!(a.agrees_with(&b));

    let c = NodeMap::new(vec![
        NodeEntry { nid: 1, flags: NodeFlags::CONNECTED },
        NodeEntry { nid: 0, flags: NodeFlags::CONNECTED },
    ]);
    assert!(!a.agrees_with(&c), "order matters for node-map agreement");

    let d = NodeMap::new(vec![
        NodeEntry { nid: 0, flags: NodeFlags::CONNECTED },
        NodeEntry { nid: 1, flags: NodeFlags::CONNECTED | NodeFlags::BANNED },
    ]);
    assert!(!a.agrees_with(&d), "flags matter for node-map agreement");
}

#[test]
fn vnnmaps_agree_on_generation_and_sequence_but_not_size_alone() {
    let a = VnnMap::new(3, vec![0, 1, 2]);
    let b = VnnMap::new(3, vec![0, 1, 2]);
    assert!(a.agrees_with(&b));

    let differs_in_generation = VnnMap::new(4, vec![0, 1, 2]);
    assert!(!a.agrees_with(&differs_in_generation));

    let differs_in_order = VnnMap::new(3, vec![2, 1, 0]);
    assert!(!a.agrees_with(&differs_in_order));
}

#[test]
fn database_maps_compare_as_sets_not_sequences() {
    let a = DatabaseMap::new(vec![1, 2, 3]);
    let b = DatabaseMap::new(vec![3, 2, 1]);
    assert_eq!(a, b, "database map equality is order-independent");

    let missing = DatabaseMap::new(vec![1, 2]);
    assert_eq!(a.missing_from(&missing), vec![3]);
}

#[test]
fn connected_nids_excludes_disconnected_entries() {
    let map = NodeMap::new(vec![
        NodeEntry { nid: 0, flags: NodeFlags::CONNECTED },
        NodeEntry { nid: 1, flags: NodeFlags::BANNED },
        NodeEntry { nid: 2, flags: NodeFlags::CONNECTED },
    ]);
    assert_eq!(map.connected_nids(), vec![0, 2]);
    assert_eq!(map.connected_count(), 2);
}

#[test]
fn higher_sequence_wins_a_record_merge() {
    let older = RecordHeader { dmaster: 0, seq: 4 };
    let newer = RecordHeader { dmaster: 1, seq: 9 };
    assert!(RecordHeader::merge_winner(&newer, &older));
    assert!(!RecordHeader::merge_winner(&older, &newer));
    assert!(RecordHeader::merge_winner(&older, &older), "equal sequence keeps the existing winner rule stable");
}
