// tests/property_test.rs

//! Property-based tests: invariants that must hold across the full input
//! space of the cluster data model, not just hand-picked examples.

mod property {
    pub mod roundtrip_test;
}
