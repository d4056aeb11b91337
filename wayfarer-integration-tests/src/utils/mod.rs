//! Utilities shared by the integration tests.

pub mod metrics;
pub mod test_tools;
