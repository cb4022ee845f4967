// tests/integration_test.rs

//! End-to-end recovery scenarios run against an in-process fake cluster.

mod integration {
    pub mod recovery_scenarios_test;
}
