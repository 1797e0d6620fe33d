//! # ferry-deploy
//!
//! Ships a tagged image to one environment and checks that it answers.
//!
//! - **Platform**: service deploy and traffic cutover through the
//!   platform's CLI.
//! - **Health**: the single post-deploy HTTP probe.
//! - **Flow**: `START → DEPLOY → WAIT → HEALTH_CHECK → SUCCESS | FAILURE`.

pub mod flow;
pub mod health;
pub mod platform;
