//! # ferry-runtime
//!
//! Everything that leaves the process goes through here.
//!
//! - **Exec**: the [`exec::Executor`] seam and its `std::process` backend.
//! - **Recording**: an executor that records command lines instead of
//!   running them (dry runs and tests).
//! - **Engine**: container engine CLI wrapper (build, tag, run, compose).
//! - **Git**: short revision lookup.

pub mod engine;
pub mod exec;
pub mod git;
pub mod recording;
