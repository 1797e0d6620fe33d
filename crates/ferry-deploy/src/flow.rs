//! The deploy state machine.
//!
//! `START → DEPLOY → WAIT → HEALTH_CHECK → SUCCESS | FAILURE`. Environment
//! and tag are validated before anything runs. There are no retries, the
//! wait is a fixed sleep rather than a readiness poll, and a failed health
//! check leaves the new deployment in place.

use std::fmt;

use chrono::{DateTime, Utc};
use ferry_common::config::PipelineConfig;
use ferry_common::error::{FerryError, Result};
use ferry_common::types::{DEPLOY_USAGE, Environment, ImageRef, ImageTag};
use ferry_runtime::exec::Executor;
use serde::Serialize;

use crate::health::{HealthChecker, HealthStatus};
use crate::platform::Platform;

/// States of a deploy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Arguments validated.
    Start,
    /// Service deployed (and, for production, traffic cut over).
    Deploy,
    /// Fixed settle delay elapsed.
    Wait,
    /// Health probe issued.
    HealthCheck,
    /// Probe returned `200`.
    Success,
    /// Probe failed. Terminal.
    Failure,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::Deploy => "DEPLOY",
            Self::Wait => "WAIT",
            Self::HealthCheck => "HEALTH_CHECK",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        };
        f.write_str(name)
    }
}

/// A validated deploy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Target environment.
    pub environment: Environment,
    /// Tag to ship.
    pub tag: ImageTag,
    /// Connection string injected as `DATABASE_URL`.
    pub database_url: Option<String>,
}

/// Record of a finished deploy run.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    /// Target environment.
    pub environment: Environment,
    /// Platform service name.
    pub service: String,
    /// Deployed image.
    pub image: ImageRef,
    /// Phases reached, in order.
    pub phases: Vec<Phase>,
    /// Health probe outcome.
    pub health: HealthStatus,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl DeployReport {
    /// Whether the run ended in [`Phase::Success`].
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.phases.last() == Some(&Phase::Success)
    }

    /// Returns the report, or [`FerryError::HealthCheck`] if the run failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the health check failed.
    pub fn into_result(self) -> Result<Self> {
        if !self.succeeded() {
            self.health.clone().into_result()?;
        }
        Ok(self)
    }
}

/// Runs deploys for one pipeline configuration.
pub struct DeployFlow<'a> {
    config: &'a PipelineConfig,
    executor: &'a dyn Executor,
    checker: HealthChecker,
    dry_run: bool,
}

impl<'a> DeployFlow<'a> {
    /// Creates a flow that executes platform commands through `executor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &'a PipelineConfig, executor: &'a dyn Executor) -> Result<Self> {
        Ok(Self {
            config,
            executor,
            checker: HealthChecker::new(config.deploy.health_timeout())?,
            dry_run: false,
        })
    }

    /// In a dry run the settle wait and the health request are printed
    /// instead of performed, and the probe counts as passed.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validates raw arguments into a request.
    ///
    /// `lookup` resolves environment variable names; it is only consulted
    /// for the database variable of a recognized environment.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::Usage`] for an unknown environment or invalid tag.
    pub fn request(
        &self,
        environment: &str,
        tag: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<DeployRequest> {
        let environment: Environment = environment.parse()?;
        let tag = ImageTag::new(tag).map_err(|_| FerryError::Usage {
            message: format!("invalid image tag: {tag:?}"),
            usage: DEPLOY_USAGE,
        })?;
        let var = &self.config.deploy.target(environment).database_url_var;
        let database_url = lookup(var).filter(|v| !v.is_empty());
        if database_url.is_none() {
            tracing::warn!(var = %var, "database URL not set, deploying without DATABASE_URL");
        }
        Ok(DeployRequest {
            environment,
            tag,
            database_url,
        })
    }

    /// Runs the state machine for a validated request.
    ///
    /// A failed health check is reported in the returned [`DeployReport`],
    /// not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the deploy or traffic cutover command fails.
    pub fn run(&self, request: &DeployRequest) -> Result<DeployReport> {
        let deploy = &self.config.deploy;
        let target = deploy.target(request.environment);
        let image = self.config.deploy_image(request.tag.clone());
        let mut phases = vec![Phase::Start];

        let platform = Platform::new(self.executor, deploy);
        transition(&mut phases, Phase::Deploy);
        platform.deploy_service(
            target,
            &image,
            self.config.app_port,
            request.database_url.as_deref(),
        )?;
        if request.environment == Environment::Production {
            platform.route_traffic_to_latest(&target.service)?;
        }

        transition(&mut phases, Phase::Wait);
        self.settle();

        transition(&mut phases, Phase::HealthCheck);
        let health = self.check_health(&target.health_url);
        transition(
            &mut phases,
            if health.passed() {
                Phase::Success
            } else {
                Phase::Failure
            },
        );

        Ok(DeployReport {
            environment: request.environment,
            service: target.service.clone(),
            image,
            phases,
            health,
            finished_at: Utc::now(),
        })
    }
}

impl DeployFlow<'_> {
    fn settle(&self) {
        let secs = self.config.deploy.settle_secs;
        if self.dry_run {
            echo(&format!("sleep {secs}"));
            return;
        }
        tracing::info!(secs, "waiting for service to settle");
        std::thread::sleep(self.config.deploy.settle_delay());
    }

    fn check_health(&self, url: &str) -> HealthStatus {
        if self.dry_run {
            echo(&format!("GET {url}"));
            return HealthStatus::Passed {
                url: url.to_string(),
            };
        }
        self.checker.probe(url)
    }
}

#[allow(clippy::print_stderr)]
fn echo(line: &str) {
    eprintln!("+ {line}");
}

fn transition(phases: &mut Vec<Phase>, next: Phase) {
    if let Some(prev) = phases.last() {
        tracing::debug!(from = %prev, to = %next, "deploy transition");
    }
    phases.push(next);
}

#[cfg(test)]
mod tests {
    use ferry_runtime::recording::RecordingExecutor;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn unknown_environment_is_usage_error() {
        let cfg = PipelineConfig::default();
        let rec = RecordingExecutor::new();
        let flow = DeployFlow::new(&cfg, &rec).expect("flow");
        let err = flow.request("qa", "latest", no_env).unwrap_err();
        assert!(matches!(err, FerryError::Usage { usage, .. } if usage == DEPLOY_USAGE));
    }

    #[test]
    fn invalid_tag_is_usage_error() {
        let cfg = PipelineConfig::default();
        let rec = RecordingExecutor::new();
        let flow = DeployFlow::new(&cfg, &rec).expect("flow");
        assert!(matches!(
            flow.request("staging", "no good", no_env),
            Err(FerryError::Usage { .. })
        ));
    }

    #[test]
    fn request_reads_environment_specific_variable() {
        let cfg = PipelineConfig::default();
        let rec = RecordingExecutor::new();
        let flow = DeployFlow::new(&cfg, &rec).expect("flow");
        let lookup = |name: &str| (name == "PROD_DATABASE_URL").then(|| "postgresql://prod".to_string());

        let prod = flow.request("production", "abc1234", lookup).expect("prod");
        assert_eq!(prod.database_url.as_deref(), Some("postgresql://prod"));

        let staging = flow.request("staging", "abc1234", lookup).expect("staging");
        assert_eq!(staging.database_url, None);
    }

    #[test]
    fn empty_database_variable_counts_as_unset() {
        let cfg = PipelineConfig::default();
        let rec = RecordingExecutor::new();
        let flow = DeployFlow::new(&cfg, &rec).expect("flow");
        let req = flow
            .request("staging", "latest", |_| Some(String::new()))
            .expect("request");
        assert_eq!(req.database_url, None);
    }

    #[test]
    fn dry_run_skips_wait_and_network() {
        let mut cfg = PipelineConfig::default();
        cfg.deploy.settle_secs = 3600;
        cfg.deploy.staging.health_url = "http://127.0.0.1:1/health".into();
        let rec = RecordingExecutor::new();
        let flow = DeployFlow::new(&cfg, &rec).expect("flow").dry_run(true);
        let request = flow.request("staging", "latest", no_env).expect("request");

        let started = std::time::Instant::now();
        let report = flow.run(&request).expect("run");

        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert!(report.succeeded());
        assert_eq!(rec.commands().len(), 1, "deploy command is still recorded");
    }

    #[test]
    fn phase_names_match_state_machine() {
        assert_eq!(Phase::HealthCheck.to_string(), "HEALTH_CHECK");
        assert_eq!(Phase::Failure.to_string(), "FAILURE");
    }
}
