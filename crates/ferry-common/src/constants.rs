//! Pipeline-wide constants and defaults.

/// Tag used when no override is given and the revision lookup fails.
pub const FALLBACK_TAG: &str = "local";

/// Alias tag applied to every successful build.
pub const LATEST_TAG: &str = "latest";

/// Tag of the image built for local integration runs.
pub const INTEGRATION_TAG: &str = "test";

/// Default image repository name.
pub const DEFAULT_IMAGE_NAME: &str = "flask-app";

/// Port the application listens on inside the container.
pub const DEFAULT_APP_PORT: u16 = 8000;

/// Health endpoint path served by the application.
pub const HEALTH_PATH: &str = "/health";

/// Default deployment region.
pub const DEFAULT_REGION: &str = "us-central1";

/// Seconds to wait between a deploy and its health check.
pub const DEFAULT_SETTLE_SECS: u64 = 30;

/// Request timeout for the health probe, in seconds.
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 10;

/// Optional pipeline configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ferry.yml";

/// Build manifest file name inside the build context.
pub const MANIFEST_FILE: &str = "Dockerfile";

/// Test composition definition written for integration runs.
pub const COMPOSE_FILE: &str = "docker-compose.test.yml";

/// Host directory bind-mounted into the app container for test results.
pub const RESULTS_DIR: &str = "test-results";

/// Dependency list copied into the builder stage.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Python module imported by the smoke test.
pub const APP_MODULE: &str = "app";

/// Prefix for throwaway smoke-test container names.
pub const SMOKE_CONTAINER_PREFIX: &str = "ferry-smoke";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "ferry";
