//! Test mode dispatch.
//!
//! Each mode is one linear procedure. The first failing command aborts it
//! with that command's exit code; nothing is retried and nothing is torn
//! down after a failure.

use std::path::PathBuf;

use ferry_common::config::PipelineConfig;
use ferry_common::constants::{COMPOSE_FILE, INTEGRATION_TAG, RESULTS_DIR};
use ferry_common::error::{FerryError, Result};
use ferry_common::types::{ImageRef, ImageTag, TestMode};
use ferry_image::manifest;
use ferry_runtime::engine::ContainerEngine;
use ferry_runtime::exec::{CommandSpec, Executor};

use crate::compose::{self, APP_SERVICE, CONTAINER_RESULTS_DIR};

/// Per-invocation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Add coverage reporting to `unit` runs.
    pub coverage: bool,
    /// Running under CI.
    pub ci: bool,
    /// Commit whose prebuilt image CI integration runs reuse.
    pub commit: Option<String>,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Mode that ran.
    pub mode: TestMode,
    /// Image exercised by an integration run.
    pub image: Option<ImageRef>,
    /// Whether the image was reused rather than built.
    pub reused_image: bool,
    /// Host directory holding integration results.
    pub results_dir: Option<PathBuf>,
}

impl RunSummary {
    const fn local(mode: TestMode) -> Self {
        Self {
            mode,
            image: None,
            reused_image: false,
            results_dir: None,
        }
    }
}

/// Runs test suites for one project.
pub struct TestRunner<'a> {
    config: &'a PipelineConfig,
    executor: &'a dyn Executor,
}

impl<'a> TestRunner<'a> {
    /// Creates a runner for `config` that executes through `executor`.
    #[must_use]
    pub fn new(config: &'a PipelineConfig, executor: &'a dyn Executor) -> Self {
        Self { config, executor }
    }

    /// Runs exactly one procedure for `mode`.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    pub fn run(&self, mode: TestMode, options: &RunOptions) -> Result<RunSummary> {
        tracing::info!(mode = %mode, "running tests");
        match mode {
            TestMode::Unit => self.unit(options.coverage),
            TestMode::Simple => self.simple(),
            TestMode::Integration => self.integration(options),
        }
    }

    fn pytest(&self) -> CommandSpec {
        CommandSpec::new(self.config.tests.python.clone())
            .args(["-m", "pytest"])
            .current_dir(self.config.context.clone())
    }

    fn unit(&self, coverage: bool) -> Result<RunSummary> {
        let tests = &self.config.tests;
        let mut cmd = self.pytest().args([tests.unit_file.as_str(), "-v"]);
        if coverage {
            cmd = cmd.args([
                format!("--cov={}", tests.coverage_source),
                "--cov-report=term-missing".to_string(),
            ]);
        }
        self.executor.check(&cmd)?;
        Ok(RunSummary::local(TestMode::Unit))
    }

    fn simple(&self) -> Result<RunSummary> {
        let cmd = self
            .pytest()
            .args([self.config.tests.simple_file.as_str(), "-v"]);
        self.executor.check(&cmd)?;
        Ok(RunSummary::local(TestMode::Simple))
    }

    fn integration(&self, options: &RunOptions) -> Result<RunSummary> {
        let config = self.config;
        let engine = ContainerEngine::new(self.executor, config.container_engine.clone());

        let (image, reused_image) = match (options.ci, options.commit.as_deref()) {
            (true, Some(commit)) => {
                let image = config.local_image(ImageTag::new(commit)?);
                tracing::info!(image = %image, "reusing CI image");
                (image, true)
            }
            (ci, _) => {
                if ci {
                    tracing::warn!("CI run without a commit identifier, building locally");
                }
                let image = config.local_image(ImageTag::new(INTEGRATION_TAG)?);
                let manifest_path =
                    manifest::ensure_manifest(&config.context, &config.manifest, config.app_port)?;
                engine.build(&config.context, &manifest_path, &image, &[])?;
                (image, false)
            }
        };

        let results_dir = config.context.join(RESULTS_DIR);
        std::fs::create_dir_all(&results_dir).map_err(|e| FerryError::Io {
            path: results_dir.clone(),
            source: e,
        })?;

        let compose_path = config.context.join(COMPOSE_FILE);
        compose::write_definition(&compose_path, &compose::test_definition(&image, config))?;

        let services = engine.compose(&compose_path);
        services.up()?;
        services.exec(APP_SERVICE, &config.tests.migrate_command)?;
        services.exec(APP_SERVICE, &self.integration_pytest())?;
        services.down()?;

        tracing::info!(results = %results_dir.display(), "integration results captured");
        Ok(RunSummary {
            mode: TestMode::Integration,
            image: Some(image),
            reused_image,
            results_dir: Some(results_dir),
        })
    }

    fn integration_pytest(&self) -> Vec<String> {
        vec![
            "python".to_string(),
            "-m".to_string(),
            "pytest".to_string(),
            self.config.tests.integration_path.clone(),
            "-v".to_string(),
            format!("--junitxml={CONTAINER_RESULTS_DIR}/junit.xml"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use ferry_runtime::recording::RecordingExecutor;

    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            context: PathBuf::from("/srv/app"),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn unit_runs_unit_file() {
        let cfg = config();
        let rec = RecordingExecutor::new();
        let summary = TestRunner::new(&cfg, &rec)
            .run(TestMode::Unit, &RunOptions::default())
            .expect("run");
        assert_eq!(summary.mode, TestMode::Unit);
        assert_eq!(rec.lines(), vec!["python -m pytest test_app.py -v"]);
        assert_eq!(
            rec.commands()[0].current_dir.as_deref(),
            Some(std::path::Path::new("/srv/app"))
        );
    }

    #[test]
    fn unit_with_coverage_adds_report_flags() {
        let cfg = config();
        let rec = RecordingExecutor::new();
        let opts = RunOptions {
            coverage: true,
            ..RunOptions::default()
        };
        let _ = TestRunner::new(&cfg, &rec)
            .run(TestMode::Unit, &opts)
            .expect("run");
        assert_eq!(
            rec.lines(),
            vec!["python -m pytest test_app.py -v --cov=src --cov-report=term-missing"]
        );
    }

    #[test]
    fn simple_runs_simple_file() {
        let cfg = config();
        let rec = RecordingExecutor::new();
        let _ = TestRunner::new(&cfg, &rec)
            .run(TestMode::Simple, &RunOptions::default())
            .expect("run");
        assert_eq!(rec.lines(), vec!["python -m pytest test_simple.py -v"]);
    }

    #[test]
    fn failing_tests_propagate_exit_code() {
        let cfg = config();
        let rec = RecordingExecutor::new().fail_when("pytest", 1);
        let err = TestRunner::new(&cfg, &rec)
            .run(TestMode::Unit, &RunOptions::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn integration_pytest_writes_junit_to_mount() {
        let cfg = config();
        let rec = RecordingExecutor::new();
        let args = TestRunner::new(&cfg, &rec).integration_pytest();
        assert_eq!(args.last().map(String::as_str), Some("--junitxml=/app/test-results/junit.xml"));
    }
}
