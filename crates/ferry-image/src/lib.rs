//! # ferry-image
//!
//! Produces the application's runtime image.
//!
//! - **Manifest**: renders the two-stage build manifest.
//! - **Tag**: resolves the content identifier for a build.
//! - **Build**: build, alias as `latest`, and smoke-test the result.

pub mod build;
pub mod manifest;
pub mod tag;
