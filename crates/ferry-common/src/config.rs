//! Pipeline configuration model.
//!
//! Every field has a built-in default, so the configuration file is
//! optional. CLI flags and environment variables are applied on top by the
//! binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{FerryError, Result};
use crate::types::{Environment, ImageRef, ImageTag, ResourceProfile};

/// Root configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Image repository name (without registry or tag).
    pub image_name: String,
    /// Registry prefix for deployed images, e.g. `gcr.io/my-project`.
    pub registry: Option<String>,
    /// Build context directory.
    pub context: PathBuf,
    /// Port the application listens on.
    pub app_port: u16,
    /// Container engine executable.
    pub container_engine: String,
    /// Manifest rendering settings.
    pub manifest: ManifestConfig,
    /// Test runner settings.
    pub tests: TestConfig,
    /// Deployment settings.
    pub deploy: DeployConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_name: constants::DEFAULT_IMAGE_NAME.to_string(),
            registry: None,
            context: PathBuf::from("."),
            app_port: constants::DEFAULT_APP_PORT,
            container_engine: "docker".to_string(),
            manifest: ManifestConfig::default(),
            tests: TestConfig::default(),
            deploy: DeployConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a YAML file.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FerryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Loads configuration from `path` if it exists, else returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Local (unregistered) reference for the given tag.
    #[must_use]
    pub fn local_image(&self, tag: ImageTag) -> ImageRef {
        ImageRef::new(self.image_name.clone(), tag)
    }

    /// Reference used by the deployment platform for the given tag.
    #[must_use]
    pub fn deploy_image(&self, tag: ImageTag) -> ImageRef {
        let repository = match &self.registry {
            Some(registry) => format!("{}/{}", registry.trim_end_matches('/'), self.image_name),
            None => self.image_name.clone(),
        };
        ImageRef::new(repository, tag)
    }
}

/// Settings for the two-stage build manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Base image for the builder stage.
    pub build_base: String,
    /// Base image for the runtime stage.
    pub runtime_base: String,
    /// Dependency list copied into the builder stage.
    pub requirements: String,
    /// Application source directory inside the context.
    pub source_dir: String,
    /// Non-privileged user the application runs as.
    pub user: String,
    /// Packages needed only to compile dependencies.
    pub build_packages: Vec<String>,
    /// Shared libraries needed at run time.
    pub runtime_packages: Vec<String>,
    /// Process started by the container.
    pub command: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            build_base: "python:3.11-slim".into(),
            runtime_base: "python:3.11-slim".into(),
            requirements: constants::REQUIREMENTS_FILE.into(),
            source_dir: "src".into(),
            user: "appuser".into(),
            build_packages: vec!["build-essential".into(), "libpq-dev".into()],
            runtime_packages: vec!["libpq5".into()],
            command: vec!["python".into(), "app.py".into()],
        }
    }
}

/// Settings for `ferry test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Python interpreter used for local runs.
    pub python: String,
    /// Test file for `unit` mode.
    pub unit_file: String,
    /// Test file for `simple` mode.
    pub simple_file: String,
    /// Test path inside the app container for `integration` mode.
    pub integration_path: String,
    /// Source directory measured by coverage.
    pub coverage_source: String,
    /// Database image for the test composition.
    pub database_image: String,
    /// Database user for the test composition.
    pub database_user: String,
    /// Password for `database_user`.
    pub database_password: String,
    /// Database name.
    pub database_name: String,
    /// Migration command run inside the app container before tests.
    pub migrate_command: Vec<String>,
    /// Environment variables consulted, in order, for the CI commit.
    pub commit_vars: Vec<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            python: "python".into(),
            unit_file: "test_app.py".into(),
            simple_file: "test_simple.py".into(),
            integration_path: "tests/".into(),
            coverage_source: "src".into(),
            database_image: "postgres:15".into(),
            database_user: "testuser".into(),
            database_password: "testpass".into(),
            database_name: "testdb".into(),
            migrate_command: vec![
                "python".into(),
                "-c".into(),
                "from app import init_db; init_db()".into(),
            ],
            commit_vars: vec!["GITHUB_SHA".into(), "CIRCLE_SHA1".into()],
        }
    }
}

/// Settings for `ferry deploy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Deployment platform executable.
    pub platform_cli: String,
    /// Platform project identifier, if not implied by the CLI's own config.
    pub project: Option<String>,
    /// Deployment region.
    pub region: String,
    /// Fixed delay between deploy and health check, in seconds.
    pub settle_secs: u64,
    /// Health probe request timeout, in seconds.
    pub health_timeout_secs: u64,
    /// Production target.
    pub production: TargetConfig,
    /// Staging target.
    pub staging: TargetConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            platform_cli: "gcloud".into(),
            project: None,
            region: constants::DEFAULT_REGION.into(),
            settle_secs: constants::DEFAULT_SETTLE_SECS,
            health_timeout_secs: constants::DEFAULT_HEALTH_TIMEOUT_SECS,
            production: TargetConfig::production(),
            staging: TargetConfig::staging(),
        }
    }
}

impl DeployConfig {
    /// Target settings for an environment.
    #[must_use]
    pub const fn target(&self, environment: Environment) -> &TargetConfig {
        match environment {
            Environment::Production => &self.production,
            Environment::Staging => &self.staging,
        }
    }

    /// Post-deploy settle delay.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// Health probe request timeout.
    #[must_use]
    pub const fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

/// One deployment environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Service name on the platform.
    pub service: String,
    /// Health endpoint probed after deploy.
    pub health_url: String,
    /// Environment variable holding the database connection string.
    pub database_url_var: String,
    /// Resource allocation.
    pub resources: ResourceProfile,
}

impl TargetConfig {
    /// Default production target.
    #[must_use]
    pub fn production() -> Self {
        Self {
            service: "flask-app-prod".into(),
            health_url: format!("https://flask-app-prod.run.app{}", constants::HEALTH_PATH),
            database_url_var: "PROD_DATABASE_URL".into(),
            resources: ResourceProfile::production(),
        }
    }

    /// Default staging target.
    #[must_use]
    pub fn staging() -> Self {
        Self {
            service: "flask-app-staging".into(),
            health_url: format!("https://flask-app-staging.run.app{}", constants::HEALTH_PATH),
            database_url_var: "STAGING_DATABASE_URL".into(),
            resources: ResourceProfile::staging(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_variables_cover_common_ci_services() {
        let cfg = TestConfig::default();
        assert_eq!(cfg.commit_vars, vec!["GITHUB_SHA", "CIRCLE_SHA1"]);
    }

    #[test]
    fn defaults_use_documented_port() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.app_port, 8000);
        assert_eq!(cfg.container_engine, "docker");
    }

    #[test]
    fn load_or_default_without_file_returns_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = PipelineConfig::load_or_default(&dir.path().join("ferry.yml"))
            .expect("defaults");
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ferry.yml");
        std::fs::write(
            &path,
            "image_name: shop\nregistry: gcr.io/acme\ndeploy:\n  settle_secs: 5\n",
        )
        .expect("write");

        let cfg = PipelineConfig::load(&path).expect("load");
        assert_eq!(cfg.image_name, "shop");
        assert_eq!(cfg.deploy.settle_secs, 5);
        assert_eq!(cfg.deploy.region, "us-central1");
        assert_eq!(cfg.deploy.staging, TargetConfig::staging());
        assert_eq!(cfg.tests, TestConfig::default());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ferry.yml");
        std::fs::write(&path, "app_port: [not a port\n").expect("write");
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(FerryError::Yaml { .. })
        ));
    }

    #[test]
    fn deploy_image_prefixes_registry() {
        let cfg = PipelineConfig {
            registry: Some("gcr.io/acme/".into()),
            ..PipelineConfig::default()
        };
        let r = cfg.deploy_image(ImageTag::latest());
        assert_eq!(r.to_string(), "gcr.io/acme/flask-app:latest");
    }

    #[test]
    fn deploy_image_without_registry_is_local_name() {
        let cfg = PipelineConfig::default();
        assert_eq!(
            cfg.deploy_image(ImageTag::fallback()),
            cfg.local_image(ImageTag::fallback())
        );
    }

    #[test]
    fn target_selects_environment() {
        let cfg = DeployConfig::default();
        assert_eq!(
            cfg.target(Environment::Production).database_url_var,
            "PROD_DATABASE_URL"
        );
        assert_eq!(
            cfg.target(Environment::Staging).database_url_var,
            "STAGING_DATABASE_URL"
        );
        assert!(cfg.target(Environment::Staging).health_url.ends_with("/health"));
    }
}
