//! CLI command definitions and dispatch.

pub mod build;
pub mod compose;
pub mod deploy;
pub mod manifest;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ferry_common::config::PipelineConfig;
use ferry_runtime::exec::{Executor, SystemExecutor};
use ferry_runtime::recording::RecordingExecutor;

/// ferry — build, verify, and deploy the web service image.
#[derive(Parser, Debug)]
#[command(name = "ferry", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the pipeline configuration file (optional).
    #[arg(long, global = true, default_value = ferry_common::constants::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Print commands instead of executing them.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one test suite: unit, simple, or integration.
    Test(test::TestArgs),
    /// Build, tag, and smoke-test the application image.
    Build(build::BuildArgs),
    /// Deploy an image tag to production or staging.
    Deploy(deploy::DeployArgs),
    /// Render the two-stage build manifest.
    Manifest(manifest::ManifestArgs),
    /// Render the integration test composition definition.
    Compose(compose::ComposeArgs),
}

/// Loaded configuration plus the executor every command runs through.
pub struct Session {
    /// Pipeline configuration.
    pub config: PipelineConfig,
    executor: Rc<dyn Executor>,
    dry_run: bool,
}

impl Session {
    /// Loads the configuration and picks the executor for this run.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but is invalid.
    pub fn open(config_path: &std::path::Path, dry_run: bool) -> anyhow::Result<Self> {
        let config = PipelineConfig::load_or_default(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        let executor: Rc<dyn Executor> = if dry_run {
            Rc::new(RecordingExecutor::echoing())
        } else {
            Rc::new(SystemExecutor::new())
        };
        Ok(Self {
            config,
            executor,
            dry_run,
        })
    }

    /// The executor commands run through.
    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Whether commands are printed instead of executed.
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let session = Session::open(&cli.config, cli.dry_run)?;
    if cli.dry_run {
        tracing::info!("dry run: commands are printed, not executed");
    }
    match cli.command {
        Command::Test(args) => test::execute(args, &session, |name| std::env::var(name).ok()),
        Command::Build(args) => build::execute(&args, &session),
        Command::Deploy(args) => deploy::execute(&args, &session, |name| std::env::var(name).ok()),
        Command::Manifest(args) => manifest::execute(&args, &session),
        Command::Compose(args) => compose::execute(&args, &session),
    }
}

#[cfg(test)]
impl Session {
    /// Session over an in-memory recorder, for command tests.
    pub fn recording(config: PipelineConfig, recorder: RecordingExecutor) -> Self {
        Self::shared(config, &Rc::new(recorder))
    }

    /// Session over a recorder the caller keeps a handle to.
    pub fn shared(config: PipelineConfig, recorder: &Rc<RecordingExecutor>) -> Self {
        Self {
            config,
            executor: Rc::clone(recorder) as Rc<dyn Executor>,
            dry_run: false,
        }
    }

    /// Marks the session as a dry run.
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::try_parse_from(["ferry", "manifest", "--dry-run", "--config", "ci.yml"])
            .expect("parse");
        assert!(cli.dry_run);
        assert_eq!(cli.config, PathBuf::from("ci.yml"));
    }

    #[test]
    fn config_defaults_to_ferry_yml() {
        let cli = Cli::try_parse_from(["ferry", "manifest"]).expect("parse");
        assert_eq!(cli.config, PathBuf::from("ferry.yml"));
        assert!(!cli.dry_run);
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = Session::open(&dir.path().join("ferry.yml"), true).expect("session");
        assert_eq!(session.config, PipelineConfig::default());
    }

    #[test]
    fn invalid_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ferry.yml");
        std::fs::write(&path, "app_port: [not, a, port]\n").expect("write");
        assert!(Session::open(&path, true).is_err());
    }
}
