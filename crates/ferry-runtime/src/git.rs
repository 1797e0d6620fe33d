//! Version-control revision lookup.

use std::path::Path;

use crate::exec::{CommandSpec, Executor};

/// Returns the abbreviated `HEAD` revision of the repository at `dir`.
///
/// Any failure (no repository, git not installed, non-zero exit, empty
/// output) yields `None`; callers choose their own fallback.
pub fn short_revision(executor: &dyn Executor, dir: &Path) -> Option<String> {
    let cmd = CommandSpec::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(dir);

    match executor.capture(&cmd) {
        Ok(out) if out.success() => {
            let rev = out.stdout.trim();
            if rev.is_empty() {
                tracing::warn!("git returned an empty revision");
                None
            } else {
                Some(rev.to_string())
            }
        }
        Ok(out) => {
            tracing::warn!(
                code = ?out.exit_code,
                stderr = %out.stderr.trim(),
                "revision lookup failed"
            );
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "revision lookup unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingExecutor;

    #[test]
    fn returns_trimmed_revision() {
        let rec = RecordingExecutor::new().respond_when("rev-parse", "9f8e7d6\n");
        assert_eq!(
            short_revision(&rec, Path::new(".")).as_deref(),
            Some("9f8e7d6")
        );
    }

    #[test]
    fn runs_in_requested_directory() {
        let rec = RecordingExecutor::new();
        let _ = short_revision(&rec, Path::new("/srv/app"));
        let cmds = rec.commands();
        assert_eq!(cmds[0].current_dir.as_deref(), Some(Path::new("/srv/app")));
    }

    #[test]
    fn non_zero_exit_is_none() {
        let rec = RecordingExecutor::new().fail_when("rev-parse", 128);
        assert!(short_revision(&rec, Path::new(".")).is_none());
    }

    #[test]
    fn missing_git_is_none() {
        let rec = RecordingExecutor::new().missing_tool("git");
        assert!(short_revision(&rec, Path::new(".")).is_none());
    }

    #[test]
    fn empty_output_is_none() {
        let rec = RecordingExecutor::new();
        assert!(short_revision(&rec, Path::new(".")).is_none());
    }

    #[test]
    fn outside_a_repository_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exec = crate::exec::SystemExecutor::new();
        assert!(short_revision(&exec, dir.path()).is_none());
    }
}
