//! `ferry build` — Build, tag, and smoke-test the application image.

use std::path::PathBuf;

use clap::Args;
use ferry_image::build::build_image;
use ferry_image::tag::TagSource;

use super::Session;
use crate::output;

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Tag override; defaults to the short git revision, then `local`.
    #[arg(long, env = "IMAGE_TAG")]
    pub tag: Option<String>,

    /// Build context directory (overrides the config file).
    #[arg(long)]
    pub context: Option<PathBuf>,
}

/// Executes the `build` command.
///
/// # Errors
///
/// Returns an error if the tag is invalid or the build, tag, or smoke
/// test step fails.
pub fn execute(args: &BuildArgs, session: &Session) -> anyhow::Result<()> {
    let mut config = session.config.clone();
    if let Some(context) = &args.context {
        config.context.clone_from(context);
    }

    output::step(&format!("Building {} from {}", config.image_name, config.context.display()));
    let outcome = build_image(&config, args.tag.as_deref(), session.executor())?;

    if outcome.tag_source == TagSource::Fallback {
        tracing::warn!(tag = %outcome.image.tag, "no git revision available");
    }
    output::success(&format!("Smoke test passed ({})", outcome.smoke_container));
    output::success(&format!("Tagged {}", outcome.latest));
    output::success(&format!("Build complete: {}", outcome.image));
    Ok(())
}
