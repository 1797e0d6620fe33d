//! `ferry deploy` — Deploy an image tag and check its health.

use clap::Args;
use ferry_common::constants::LATEST_TAG;
use ferry_deploy::flow::{DeployFlow, DeployReport};
use ferry_deploy::health::HealthStatus;

use super::Session;
use crate::output;

/// Arguments for the `deploy` command.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Target environment: production or staging.
    #[arg(default_value = "staging")]
    pub environment: String,

    /// Image tag to deploy.
    #[arg(default_value = LATEST_TAG)]
    pub tag: String,

    /// Print the deploy report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `deploy` command.
///
/// `lookup` resolves environment variables (the database URL).
///
/// # Errors
///
/// Returns an error for an unknown environment or invalid tag, when the
/// platform CLI fails, or when the health check fails.
pub fn execute(
    args: &DeployArgs,
    session: &Session,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    let flow = DeployFlow::new(&session.config, session.executor())?.dry_run(session.dry_run());
    let request = flow.request(&args.environment, &args.tag, lookup)?;

    output::step(&format!(
        "Deploying {} to {}",
        session.config.deploy_image(request.tag.clone()),
        request.environment
    ));
    let report = flow.run(&request)?;
    print_report(&report, args.json)?;
    let _ = report.into_result()?;
    Ok(())
}

fn print_report(report: &DeployReport, json: bool) -> anyhow::Result<()> {
    match &report.health {
        HealthStatus::Passed { .. } => output::success("Health check passed"),
        HealthStatus::Failed { reason, .. } => {
            output::failure(&format!("Health check failed: {reason}"));
        }
    }
    if json {
        output::raw(&format!("{}\n", serde_json::to_string_pretty(report)?));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use ferry_common::config::PipelineConfig;
    use ferry_common::error::FerryError;
    use ferry_runtime::recording::RecordingExecutor;

    use super::*;

    fn args(environment: &str) -> DeployArgs {
        DeployArgs {
            environment: environment.to_string(),
            tag: LATEST_TAG.to_string(),
            json: false,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn unknown_environment_is_usage_error() {
        let session = Session::recording(PipelineConfig::default(), RecordingExecutor::new());
        let err = execute(&args("qa"), &session, no_env).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FerryError>(),
            Some(FerryError::Usage { .. })
        ));
        assert_eq!(output::exit_code(&err), 1);
    }

    #[test]
    fn failed_platform_call_propagates_code() {
        let session = Session::recording(
            PipelineConfig::default(),
            RecordingExecutor::new().fail_when("run deploy", 3),
        );
        let err = execute(&args("staging"), &session, no_env).unwrap_err();
        assert_eq!(output::exit_code(&err), 3);
    }

    #[test]
    fn dry_run_returns_without_waiting_or_probing() {
        let mut config = PipelineConfig::default();
        config.deploy.settle_secs = 3600;
        config.deploy.production.health_url = "http://127.0.0.1:1/health".into();
        let recorder = Rc::new(RecordingExecutor::new());
        let session = Session::shared(config, &recorder).with_dry_run();

        let started = Instant::now();
        execute(&args("production"), &session, no_env).expect("dry run deploy");

        assert!(started.elapsed() < Duration::from_secs(5));
        let lines = recorder.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("update-traffic"));
    }

    #[test]
    fn health_failure_exits_one() {
        let mut config = PipelineConfig::default();
        config.deploy.settle_secs = 0;
        config.deploy.staging.health_url = "http://127.0.0.1:1/health".into();
        let session = Session::recording(config, RecordingExecutor::new());

        let err = execute(&args("staging"), &session, no_env).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FerryError>(),
            Some(FerryError::HealthCheck { .. })
        ));
        assert_eq!(output::exit_code(&err), 1);
    }
}
