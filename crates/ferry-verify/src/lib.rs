//! # ferry-verify
//!
//! Runs the application's test suites.
//!
//! - **Compose**: the two-service definition (application plus database)
//!   used by integration runs.
//! - **Runner**: dispatches a [`ferry_common::types::TestMode`] to exactly
//!   one fail-fast procedure.

pub mod compose;
pub mod runner;
