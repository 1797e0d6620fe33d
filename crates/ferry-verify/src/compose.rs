//! Test composition definition.
//!
//! Two services: `app` (the image under test) and `db` (PostgreSQL). The
//! app service only starts once the database's readiness probe passes, and
//! a host directory is bind-mounted for test results.

use std::collections::BTreeMap;
use std::path::Path;

use ferry_common::config::PipelineConfig;
use ferry_common::constants::RESULTS_DIR;
use ferry_common::error::{FerryError, Result};
use ferry_common::types::ImageRef;
use serde::{Deserialize, Serialize};

/// Name of the application service.
pub const APP_SERVICE: &str = "app";

/// Name of the database service.
pub const DB_SERVICE: &str = "db";

/// Path inside the app container where results are written.
pub const CONTAINER_RESULTS_DIR: &str = "/app/test-results";

const DB_PORT: u16 = 5432;

/// Root of a compose file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFile {
    /// Services by name.
    pub services: BTreeMap<String, Service>,
}

/// One service definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Image to run.
    pub image: String,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Published ports, `host:container`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Startup dependencies and their gating condition.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, Dependency>,
    /// Bind mounts, `host:container`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Readiness probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Healthcheck>,
}

/// Gating condition for a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// `service_started`, `service_healthy`, or `service_completed_successfully`.
    pub condition: String,
}

/// Container readiness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthcheck {
    /// Probe command in compose list form.
    pub test: Vec<String>,
    /// Time between probes.
    pub interval: String,
    /// Time before a probe is considered failed.
    pub timeout: String,
    /// Consecutive failures before unhealthy.
    pub retries: u32,
}

/// Builds the integration-test definition for `image`.
#[must_use]
pub fn test_definition(image: &ImageRef, config: &PipelineConfig) -> ComposeFile {
    let tests = &config.tests;
    let database_url = format!(
        "postgresql://{}:{}@{DB_SERVICE}:{DB_PORT}/{}",
        tests.database_user, tests.database_password, tests.database_name
    );

    let app = Service {
        image: image.to_string(),
        environment: BTreeMap::from([
            ("DATABASE_URL".to_string(), database_url),
            ("PORT".to_string(), config.app_port.to_string()),
        ]),
        ports: vec![format!("{port}:{port}", port = config.app_port)],
        depends_on: BTreeMap::from([(
            DB_SERVICE.to_string(),
            Dependency {
                condition: "service_healthy".to_string(),
            },
        )]),
        volumes: vec![format!("./{RESULTS_DIR}:{CONTAINER_RESULTS_DIR}")],
        healthcheck: None,
    };

    let db = Service {
        image: tests.database_image.clone(),
        environment: BTreeMap::from([
            ("POSTGRES_USER".to_string(), tests.database_user.clone()),
            ("POSTGRES_PASSWORD".to_string(), tests.database_password.clone()),
            ("POSTGRES_DB".to_string(), tests.database_name.clone()),
        ]),
        healthcheck: Some(Healthcheck {
            test: vec![
                "CMD-SHELL".to_string(),
                format!(
                    "pg_isready -U {} -d {}",
                    tests.database_user, tests.database_name
                ),
            ],
            interval: "5s".to_string(),
            timeout: "5s".to_string(),
            retries: 5,
        }),
        ..Service::default()
    };

    ComposeFile {
        services: BTreeMap::from([(APP_SERVICE.to_string(), app), (DB_SERVICE.to_string(), db)]),
    }
}

/// Serializes a definition to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(definition: &ComposeFile) -> Result<String> {
    Ok(serde_yaml::to_string(definition)?)
}

/// Writes a definition to `path`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_definition(path: &Path, definition: &ComposeFile) -> Result<()> {
    let yaml = render(definition)?;
    std::fs::write(path, yaml).map_err(|e| FerryError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), "wrote test composition");
    Ok(())
}

#[cfg(test)]
mod tests {
    use ferry_common::types::ImageTag;

    use super::*;

    fn definition() -> ComposeFile {
        let config = PipelineConfig::default();
        let image = config.local_image(ImageTag::new("test").expect("tag"));
        test_definition(&image, &config)
    }

    #[test]
    fn app_waits_for_healthy_database() {
        let def = definition();
        let app = &def.services[APP_SERVICE];
        assert_eq!(app.depends_on[DB_SERVICE].condition, "service_healthy");
        assert!(def.services[DB_SERVICE].healthcheck.is_some());
    }

    #[test]
    fn app_mounts_results_directory() {
        let def = definition();
        assert_eq!(
            def.services[APP_SERVICE].volumes,
            vec!["./test-results:/app/test-results"]
        );
    }

    #[test]
    fn app_points_at_database_service() {
        let def = definition();
        assert_eq!(
            def.services[APP_SERVICE].environment["DATABASE_URL"],
            "postgresql://testuser:testpass@db:5432/testdb"
        );
        assert_eq!(def.services[APP_SERVICE].image, "flask-app:test");
    }

    #[test]
    fn database_probe_uses_pg_isready() {
        let def = definition();
        let probe = def.services[DB_SERVICE].healthcheck.as_ref().expect("probe");
        assert_eq!(probe.test[0], "CMD-SHELL");
        assert_eq!(probe.test[1], "pg_isready -U testuser -d testdb");
    }

    #[test]
    fn rendered_yaml_parses_back() {
        let def = definition();
        let yaml = render(&def).expect("render");
        let back: ComposeFile = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(back, def);
    }

    #[test]
    fn rendered_yaml_omits_empty_sections() {
        let yaml = render(&definition()).expect("render");
        let db_section = yaml.split("\n  db:\n").nth(1).expect("db section");
        assert!(!db_section.contains("depends_on"));
        assert!(!db_section.contains("volumes"));
    }

    #[test]
    fn write_definition_creates_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("docker-compose.test.yml");
        write_definition(&path, &definition()).expect("write");
        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.starts_with("services:"));
    }
}
