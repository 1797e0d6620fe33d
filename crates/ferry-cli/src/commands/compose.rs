//! `ferry compose` — Render the integration test composition definition.

use std::path::PathBuf;

use clap::Args;
use ferry_common::constants::INTEGRATION_TAG;
use ferry_common::types::{ImageRef, ImageTag};
use ferry_verify::compose;

use super::Session;
use crate::output;

/// Arguments for the `compose` command.
#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Write to this path instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Application image (defaults to the integration test image).
    #[arg(long)]
    pub image: Option<ImageRef>,
}

/// Executes the `compose` command.
///
/// # Errors
///
/// Returns an error if rendering or writing the definition fails.
pub fn execute(args: &ComposeArgs, session: &Session) -> anyhow::Result<()> {
    let config = &session.config;
    let image = match &args.image {
        Some(image) => image.clone(),
        None => config.local_image(ImageTag::new(INTEGRATION_TAG)?),
    };
    let definition = compose::test_definition(&image, config);
    match &args.output {
        Some(path) => {
            compose::write_definition(path, &definition)?;
            output::success(&format!("Wrote {}", path.display()));
        }
        None => output::raw(&compose::render(&definition)?),
    }
    Ok(())
}
