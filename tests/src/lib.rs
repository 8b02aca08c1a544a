//! Shared harness for the integration test suite.

pub mod relay;
pub mod setup;
