//! # ferry-common
//!
//! Shared types, error definitions, pipeline configuration, and constants
//! used across the entire ferry workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives (image tags, environment and
//! test-mode selectors, resource profiles) that all other crates build upon.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
