#![warn(missing_docs, clippy::missing_docs_in_private_items)]
// None of the tests are seen by the linter, so none of the utilities are marked
// as used. But docs don't generate for the below if they are `#[cfg(test)]`.
#![allow(dead_code)]

//! Tests for Wayfarer that work by reading from the external API only.
//!
//! The paths used here are the public API of the service, so they are kept
//! stable on purpose.
//!
//! This is a separate crate so that it produces a single test binary instead
//! of one test per file like would happen if this were `wayfarer/tests/...`.
//!
//! The primary tool used by tests is [`wayfarer_test`], which starts the server
//! on an in-memory store and hands the test a [`TestingTools`] to seed
//! documents, send requests and inspect metrics.
//!
//! ```no_run
//! use wayfarer_integration_tests::{wayfarer_test, TestingTools};
//!
//! async fn lbheartbeat_works() {
//!     wayfarer_test(
//!         |_| (),
//!         |TestingTools { test_client, .. }| async move {
//!             let response = test_client
//!                 .get("/__lbheartbeat__")
//!                 .send()
//!                 .await
//!                 .expect("failed to execute request");
//!             assert!(response.status().is_success());
//!         },
//!     )
//!     .await
//! }
//! ```

mod airline;
mod airport;
mod dockerflow;
mod general;
mod hotel;
mod metrics;
mod route;
mod utils;

pub use crate::utils::{
    metrics::MetricsWatcher,
    test_tools::{wayfarer_test, TestReqwestClient, TestingTools},
};
