//! Domain primitive types used across the ferry workspace.
//!
//! All of these are transient, argument-scoped values: they are recomputed
//! on every invocation and never persisted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{FALLBACK_TAG, LATEST_TAG};
use crate::error::{FerryError, Result};

/// Usage line for `ferry test`.
pub const TEST_USAGE: &str = "Usage: ferry test [unit|simple|integration]";

/// Usage line for `ferry deploy`.
pub const DEPLOY_USAGE: &str = "Usage: ferry deploy [production|staging] [image_tag]";

/// Usage line for `ferry build`.
pub const BUILD_USAGE: &str = "Usage: IMAGE_TAG=<tag> ferry build";

const MAX_TAG_LEN: usize = 128;

/// Identifier of one built image artifact.
///
/// Follows the container tag grammar: up to 128 characters from
/// `[A-Za-z0-9_.-]`, not starting with `.` or `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageTag(String);

impl ImageTag {
    /// Creates a validated tag.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::Usage`] if the value is not a valid tag.
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        let valid_chars = tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
        let valid_start = tag
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_chars || !valid_start || tag.len() > MAX_TAG_LEN {
            return Err(FerryError::Usage {
                message: format!("invalid image tag: {tag:?}"),
                usage: BUILD_USAGE,
            });
        }
        Ok(Self(tag))
    }

    /// The `latest` alias.
    #[must_use]
    pub fn latest() -> Self {
        Self(LATEST_TAG.to_string())
    }

    /// The tag used when no revision can be determined.
    #[must_use]
    pub fn fallback() -> Self {
        Self(FALLBACK_TAG.to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully qualified image reference: `repository:tag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Repository, optionally prefixed by a registry host and path.
    pub repository: String,
    /// Tag within the repository.
    pub tag: ImageTag,
}

impl ImageRef {
    /// Creates a reference from a repository and tag.
    #[must_use]
    pub fn new(repository: impl Into<String>, tag: ImageTag) -> Self {
        Self {
            repository: repository.into(),
            tag,
        }
    }

    /// Returns the same repository with a different tag.
    #[must_use]
    pub fn with_tag(&self, tag: ImageTag) -> Self {
        Self::new(self.repository.clone(), tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

impl FromStr for ImageRef {
    type Err = FerryError;

    /// Parses `repository[:tag]`; a missing tag means `latest`.
    ///
    /// A colon inside a registry host (`localhost:5000/app`) is not a tag
    /// separator.
    fn from_str(s: &str) -> Result<Self> {
        let (repository, tag) = match s.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => (repo, ImageTag::new(tag)?),
            _ => (s, ImageTag::latest()),
        };
        if repository.is_empty() {
            return Err(FerryError::Usage {
                message: format!("invalid image reference: {s:?}"),
                usage: BUILD_USAGE,
            });
        }
        Ok(Self::new(repository, tag))
    }
}

/// Verification procedure selected by `ferry test`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Local test-file execution.
    #[default]
    Unit,
    /// Minimal alternate test file.
    Simple,
    /// Containerised run against a database service.
    Integration,
}

impl FromStr for TestMode {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unit" => Ok(Self::Unit),
            "simple" => Ok(Self::Simple),
            "integration" => Ok(Self::Integration),
            other => Err(FerryError::Usage {
                message: format!("unknown test mode: {other}"),
                usage: TEST_USAGE,
            }),
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "unit"),
            Self::Simple => write!(f, "simple"),
            Self::Integration => write!(f, "integration"),
        }
    }
}

/// Deployment target selected by `ferry deploy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Live environment; receives a traffic cutover after deploy.
    Production,
    /// Pre-production environment.
    #[default]
    Staging,
}

impl FromStr for Environment {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            other => Err(FerryError::Usage {
                message: format!("unknown environment: {other}"),
                usage: DEPLOY_USAGE,
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Staging => write!(f, "staging"),
        }
    }
}

/// Resource allocation for one deployed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProfile {
    /// Memory limit in platform notation (e.g. `512Mi`).
    pub memory: String,
    /// Number of vCPUs.
    pub cpu: u32,
    /// Upper bound on running instances.
    pub max_instances: u32,
    /// Concurrent requests per instance.
    pub concurrency: u32,
}

impl ResourceProfile {
    /// Default allocation for production.
    #[must_use]
    pub fn production() -> Self {
        Self {
            memory: "1Gi".into(),
            cpu: 2,
            max_instances: 10,
            concurrency: 80,
        }
    }

    /// Default allocation for staging.
    #[must_use]
    pub fn staging() -> Self {
        Self {
            memory: "512Mi".into(),
            cpu: 1,
            max_instances: 3,
            concurrency: 40,
        }
    }
}
