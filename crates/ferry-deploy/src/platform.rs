//! Managed serverless platform operations.

use ferry_common::config::{DeployConfig, TargetConfig};
use ferry_common::error::Result;
use ferry_common::types::ImageRef;
use ferry_runtime::exec::{CommandSpec, Executor};

/// Deploys services through the platform CLI.
pub struct Platform<'a> {
    executor: &'a dyn Executor,
    config: &'a DeployConfig,
}

impl<'a> Platform<'a> {
    /// Creates a platform client for the given deploy settings.
    #[must_use]
    pub fn new(executor: &'a dyn Executor, config: &'a DeployConfig) -> Self {
        Self { executor, config }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(self.config.platform_cli.clone()).args(["run"])
    }

    fn scoped(&self, cmd: CommandSpec) -> CommandSpec {
        let cmd = cmd.args([
            "--platform".to_string(),
            "managed".to_string(),
            "--region".to_string(),
            self.config.region.clone(),
        ]);
        match &self.config.project {
            Some(project) => cmd.args(["--project".to_string(), project.clone()]),
            None => cmd,
        }
    }

    /// Deploys `image` as the target's service with its resource profile.
    ///
    /// `database_url`, when present, is injected as `DATABASE_URL` and masked
    /// in logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform CLI fails.
    pub fn deploy_service(
        &self,
        target: &TargetConfig,
        image: &ImageRef,
        port: u16,
        database_url: Option<&str>,
    ) -> Result<()> {
        let resources = &target.resources;
        let mut cmd = self.scoped(
            self.command()
                .args(["deploy".to_string(), target.service.clone()])
                .args(["--image".to_string(), image.to_string()]),
        );
        cmd = cmd
            .args(["--port".to_string(), port.to_string()])
            .args(["--memory".to_string(), resources.memory.clone()])
            .args(["--cpu".to_string(), resources.cpu.to_string()])
            .args(["--max-instances".to_string(), resources.max_instances.to_string()])
            .args(["--concurrency".to_string(), resources.concurrency.to_string()])
            .arg("--allow-unauthenticated")
            .arg("--quiet");
        if let Some(url) = database_url {
            cmd = cmd
                .arg("--set-env-vars")
                .secret_arg(format!("DATABASE_URL={url}"));
        }
        tracing::info!(service = %target.service, image = %image, "deploying service");
        self.executor.check(&cmd)
    }

    /// Routes all traffic for `service` to its latest revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform CLI fails.
    pub fn route_traffic_to_latest(&self, service: &str) -> Result<()> {
        let cmd = self.scoped(
            self.command()
                .args(["services", "update-traffic", service, "--to-latest"]),
        );
        tracing::info!(service, "cutting traffic over to latest revision");
        self.executor.check(&cmd)
    }
}

#[cfg(test)]
mod tests {
    use ferry_common::types::ImageTag;
    use ferry_runtime::recording::RecordingExecutor;

    use super::*;

    fn image() -> ImageRef {
        ImageRef::new("gcr.io/acme/flask-app", ImageTag::latest())
    }

    #[test]
    fn deploy_passes_staging_resources() {
        let cfg = DeployConfig::default();
        let rec = RecordingExecutor::new();
        Platform::new(&rec, &cfg)
            .deploy_service(&cfg.staging, &image(), 8000, None)
            .expect("deploy");
        assert_eq!(
            rec.lines(),
            vec![
                "gcloud run deploy flask-app-staging --image gcr.io/acme/flask-app:latest \
                 --platform managed --region us-central1 --port 8000 --memory 512Mi --cpu 1 \
                 --max-instances 3 --concurrency 40 --allow-unauthenticated --quiet"
            ]
        );
    }

    #[test]
    fn deploy_injects_masked_database_url() {
        let cfg = DeployConfig::default();
        let rec = RecordingExecutor::new();
        Platform::new(&rec, &cfg)
            .deploy_service(&cfg.production, &image(), 8000, Some("postgresql://u:p@db/prod"))
            .expect("deploy");
        let cmd = &rec.commands()[0];
        assert!(cmd.args.contains(&"DATABASE_URL=postgresql://u:p@db/prod".to_string()));
        assert!(rec.lines()[0].ends_with("--set-env-vars DATABASE_URL=***"));
    }

    #[test]
    fn project_is_passed_when_configured() {
        let cfg = DeployConfig {
            project: Some("acme-prod".into()),
            ..DeployConfig::default()
        };
        let rec = RecordingExecutor::new();
        Platform::new(&rec, &cfg)
            .route_traffic_to_latest("flask-app-prod")
            .expect("cutover");
        assert_eq!(
            rec.lines(),
            vec![
                "gcloud run services update-traffic flask-app-prod --to-latest \
                 --platform managed --region us-central1 --project acme-prod"
            ]
        );
    }
}
