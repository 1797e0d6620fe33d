//! `ferry manifest` — Render the two-stage build manifest.

use std::path::PathBuf;

use clap::Args;
use ferry_image::manifest;

use super::Session;
use crate::output;

/// Arguments for the `manifest` command.
#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Write to this path instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes the `manifest` command.
///
/// # Errors
///
/// Returns an error if the output file cannot be written.
pub fn execute(args: &ManifestArgs, session: &Session) -> anyhow::Result<()> {
    let config = &session.config;
    match &args.output {
        Some(path) => {
            manifest::write_manifest(path, &config.manifest, config.app_port)?;
            output::success(&format!("Wrote {}", path.display()));
        }
        None => output::raw(&manifest::render_manifest(&config.manifest, config.app_port)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ferry_common::config::PipelineConfig;
    use ferry_runtime::recording::RecordingExecutor;

    use super::*;

    #[test]
    fn writes_manifest_to_output_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Dockerfile.rendered");
        let session = Session::recording(PipelineConfig::default(), RecordingExecutor::new());

        execute(&ManifestArgs { output: Some(path.clone()) }, &session).expect("render");

        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content.matches("FROM ").count(), 2);
        assert!(content.contains("EXPOSE 8000"));
    }
}
