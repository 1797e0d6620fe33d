//! Build, alias, and smoke-test the application image.

use ferry_common::config::PipelineConfig;
use ferry_common::constants::{APP_MODULE, SMOKE_CONTAINER_PREFIX};
use ferry_common::error::Result;
use ferry_common::types::{ImageRef, ImageTag};
use ferry_runtime::engine::ContainerEngine;
use ferry_runtime::exec::Executor;

use crate::manifest;
use crate::tag::{self, TagSource};

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Image tagged with the resolved identifier.
    pub image: ImageRef,
    /// `latest` alias of the same artifact.
    pub latest: ImageRef,
    /// Where the tag came from.
    pub tag_source: TagSource,
    /// Name of the (already removed) smoke-test container.
    pub smoke_container: String,
}

/// Builds the application image, aliases it as `latest`, and smoke-tests it.
///
/// The smoke test imports the application module inside a throwaway
/// container started with `--rm`, so it is removed whatever the outcome.
///
/// # Errors
///
/// Returns the first failing step's error: an invalid tag override, a
/// manifest write failure, a failed build, a failed tag, or a failed import.
pub fn build_image(
    config: &PipelineConfig,
    tag_override: Option<&str>,
    executor: &dyn Executor,
) -> Result<BuildOutcome> {
    let (tag, tag_source) = tag::resolve_tag(tag_override, executor, &config.context)?;
    let image = config.local_image(tag.clone());
    let latest = image.with_tag(ImageTag::latest());

    let manifest_path = manifest::ensure_manifest(&config.context, &config.manifest, config.app_port)?;

    let engine = ContainerEngine::new(executor, config.container_engine.clone());
    engine.build(&config.context, &manifest_path, &image, &labels(&tag))?;
    engine.tag(&image, &latest)?;

    let smoke_container = format!("{SMOKE_CONTAINER_PREFIX}-{}", uuid::Uuid::new_v4().simple());
    engine.run_ephemeral(&smoke_container, &image, &smoke_command())?;
    tracing::info!(image = %image, "smoke test passed");

    Ok(BuildOutcome {
        image,
        latest,
        tag_source,
        smoke_container,
    })
}

fn labels(tag: &ImageTag) -> Vec<(String, String)> {
    vec![
        (
            "org.opencontainers.image.revision".to_string(),
            tag.to_string(),
        ),
        (
            "org.opencontainers.image.created".to_string(),
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ),
    ]
}

fn smoke_command() -> Vec<String> {
    vec![
        "python".to_string(),
        "-c".to_string(),
        format!("import {APP_MODULE}"),
    ]
}
