//! Container engine CLI wrapper.
//!
//! Translates pipeline operations into `docker` (or compatible) command
//! lines. Every call blocks until the engine exits and fails on a non-zero
//! status.

use std::path::Path;

use ferry_common::error::Result;
use ferry_common::types::ImageRef;

use crate::exec::{CommandSpec, Executor};

/// Drives a container engine through its command-line interface.
pub struct ContainerEngine<'a> {
    executor: &'a dyn Executor,
    binary: String,
}

impl<'a> ContainerEngine<'a> {
    /// Creates an engine that invokes `binary` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn Executor, binary: impl Into<String>) -> Self {
        Self {
            executor,
            binary: binary.into(),
        }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(self.binary.clone())
    }

    /// Builds `image` from `context` using the manifest at `manifest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the build fails; no image is tagged in that case.
    pub fn build(
        &self,
        context: &Path,
        manifest: &Path,
        image: &ImageRef,
        labels: &[(String, String)],
    ) -> Result<()> {
        let mut cmd = self
            .command()
            .args(["build", "-f"])
            .arg(manifest.display().to_string())
            .args(["-t".to_string(), image.to_string()]);
        for (key, value) in labels {
            cmd = cmd.args(["--label".to_string(), format!("{key}={value}")]);
        }
        let cmd = cmd.arg(context.display().to_string());
        tracing::info!(image = %image, context = %context.display(), "building image");
        self.executor.check(&cmd)
    }

    /// Adds `target` as another name for `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` does not exist or tagging fails.
    pub fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<()> {
        let cmd = self
            .command()
            .args(["tag".to_string(), source.to_string(), target.to_string()]);
        tracing::info!(source = %source, target = %target, "tagging image");
        self.executor.check(&cmd)
    }

    /// Runs `command` in a throwaway container that the engine removes on exit.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the container's exit code if it fails.
    pub fn run_ephemeral(&self, name: &str, image: &ImageRef, command: &[String]) -> Result<()> {
        let cmd = self
            .command()
            .args(["run", "--rm", "--name", name])
            .arg(image.to_string())
            .args(command.iter().cloned());
        tracing::info!(name, image = %image, "running ephemeral container");
        self.executor.check(&cmd)
    }

    /// Returns a handle for a multi-service definition file.
    #[must_use]
    pub fn compose<'e>(&'e self, file: &'e Path) -> Compose<'e> {
        Compose { engine: self, file }
    }
}

/// Operations on one compose definition.
pub struct Compose<'e> {
    engine: &'e ContainerEngine<'e>,
    file: &'e Path,
}

impl Compose<'_> {
    fn command(&self) -> CommandSpec {
        self.engine
            .command()
            .args(["compose", "-f"])
            .arg(self.file.display().to_string())
    }

    /// Starts all services detached and waits until they are running.
    ///
    /// Startup order and readiness gating come from the definition itself.
    ///
    /// # Errors
    ///
    /// Returns an error if any service fails to start.
    pub fn up(&self) -> Result<()> {
        tracing::info!(file = %self.file.display(), "starting services");
        self.engine
            .executor
            .check(&self.command().args(["up", "-d", "--wait"]))
    }

    /// Runs `command` inside the running `service` container, without a TTY.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the command's exit code if it fails.
    pub fn exec(&self, service: &str, command: &[String]) -> Result<()> {
        tracing::info!(service, command = ?command, "exec in service");
        self.engine.executor.check(
            &self
                .command()
                .args(["exec", "-T", service])
                .args(command.iter().cloned()),
        )
    }

    /// Stops all services and removes their volumes.
    ///
    /// # Errors
    ///
    /// Returns an error if teardown fails.
    pub fn down(&self) -> Result<()> {
        tracing::info!(file = %self.file.display(), "stopping services");
        self.engine
            .executor
            .check(&self.command().args(["down", "-v"]))
    }
}

#[cfg(test)]
mod tests {
    use ferry_common::error::FerryError;
    use ferry_common::types::ImageTag;

    use super::*;
    use crate::recording::RecordingExecutor;

    fn image(tag: &str) -> ImageRef {
        ImageRef::new("flask-app", ImageTag::new(tag).expect("tag"))
    }

    #[test]
    fn build_passes_manifest_tag_labels_and_context() {
        let rec = RecordingExecutor::new();
        let engine = ContainerEngine::new(&rec, "docker");
        engine
            .build(
                Path::new("."),
                Path::new("./Dockerfile"),
                &image("abc1234"),
                &[("org.opencontainers.image.revision".into(), "abc1234".into())],
            )
            .expect("build");
        assert_eq!(
            rec.lines(),
            vec![
                "docker build -f ./Dockerfile -t flask-app:abc1234 \
                 --label org.opencontainers.image.revision=abc1234 ."
            ]
        );
    }

    #[test]
    fn tag_aliases_source() {
        let rec = RecordingExecutor::new();
        ContainerEngine::new(&rec, "docker")
            .tag(&image("abc1234"), &image("latest"))
            .expect("tag");
        assert_eq!(rec.lines(), vec!["docker tag flask-app:abc1234 flask-app:latest"]);
    }

    #[test]
    fn ephemeral_run_uses_rm() {
        let rec = RecordingExecutor::new();
        ContainerEngine::new(&rec, "podman")
            .run_ephemeral(
                "smoke-1",
                &image("local"),
                &["python".into(), "-c".into(), "import app".into()],
            )
            .expect("run");
        assert_eq!(
            rec.lines(),
            vec!["podman run --rm --name smoke-1 flask-app:local python -c 'import app'"]
        );
    }

    #[test]
    fn ephemeral_failure_carries_exit_code() {
        let rec = RecordingExecutor::new().fail_when("import app", 1);
        let err = ContainerEngine::new(&rec, "docker")
            .run_ephemeral("s", &image("local"), &["python".into(), "-c".into(), "import app".into()])
            .unwrap_err();
        assert!(matches!(err, FerryError::CommandFailed { code: Some(1), .. }));
    }

    #[test]
    fn compose_commands_target_definition_file() {
        let rec = RecordingExecutor::new();
        let engine = ContainerEngine::new(&rec, "docker");
        let file = Path::new("docker-compose.test.yml");
        let compose = engine.compose(file);
        compose.up().expect("up");
        compose
            .exec("app", &["python".into(), "-m".into(), "pytest".into()])
            .expect("exec");
        compose.down().expect("down");
        assert_eq!(
            rec.lines(),
            vec![
                "docker compose -f docker-compose.test.yml up -d --wait",
                "docker compose -f docker-compose.test.yml exec -T app python -m pytest",
                "docker compose -f docker-compose.test.yml down -v",
            ]
        );
    }
}
