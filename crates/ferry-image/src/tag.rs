//! Build tag resolution.

use std::path::Path;

use ferry_common::error::Result;
use ferry_common::types::ImageTag;
use ferry_runtime::exec::Executor;
use ferry_runtime::git;

/// Where a resolved tag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    /// Explicit override (`IMAGE_TAG`).
    Override,
    /// Short revision of the repository `HEAD`.
    Revision,
    /// No override and no revision available.
    Fallback,
}

/// Resolves the tag for a build.
///
/// Precedence: a non-empty `override_tag`, then the short revision of the
/// repository at `repo_dir`, then the literal `local`. The repository is not
/// consulted when an override is present.
///
/// # Errors
///
/// Returns a usage error if the override is not a valid tag.
pub fn resolve_tag(
    override_tag: Option<&str>,
    executor: &dyn Executor,
    repo_dir: &Path,
) -> Result<(ImageTag, TagSource)> {
    if let Some(tag) = override_tag.map(str::trim).filter(|t| !t.is_empty()) {
        tracing::info!(tag, "using tag override");
        return Ok((ImageTag::new(tag)?, TagSource::Override));
    }

    let resolved = git::short_revision(executor, repo_dir).and_then(|rev| {
        ImageTag::new(rev)
            .inspect_err(|e| tracing::warn!(error = %e, "revision is not a valid tag"))
            .ok()
    });
    match resolved {
        Some(tag) => {
            tracing::info!(tag = %tag, "using revision tag");
            Ok((tag, TagSource::Revision))
        }
        None => {
            tracing::info!("no revision available, using fallback tag");
            Ok((ImageTag::fallback(), TagSource::Fallback))
        }
    }
}
