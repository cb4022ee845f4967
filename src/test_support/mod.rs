// src/test_support/mod.rs

//! In-process test doubles for a small simulated cluster, built on
//! `tokio::io::duplex` rather than real sockets so unit and integration
//! tests can exercise the full client/wire stack without a real daemon.
//! Enabled for unit tests (`cfg(test)`) and for the crate's own `tests/`
//! directory (`feature = "test-support"`).

mod fake_node;

pub use fake_node::{ClusterRegistry, FakeNode, NodeState};
