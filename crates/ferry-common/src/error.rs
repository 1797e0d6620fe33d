//! Unified error type for the ferry workspace.
//!
//! Every pipeline step fails fast: the first error aborts the invocation and
//! is mapped to a process exit code by the CLI (see [`FerryError::exit_code`]).

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum FerryError {
    /// An argument was not recognized. Nothing has been executed yet.
    #[error("{message}")]
    Usage {
        /// What was wrong with the argument.
        message: String,
        /// Usage line for the command that rejected it.
        usage: &'static str,
    },

    /// A required executable is not on `PATH`.
    #[error("required tool not found on PATH: {program}")]
    ToolNotFound {
        /// Name of the missing executable.
        program: String,
    },

    /// An external command exited unsuccessfully.
    #[error("command failed{}: {command}", exit_suffix(.code))]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
    },

    /// The post-deploy health probe did not return `200`.
    #[error("health check failed for {url}: {reason}")]
    HealthCheck {
        /// Probed URL.
        url: String,
        /// Status or transport failure description.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// JSON serialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl FerryError {
    /// Process exit code for this error.
    ///
    /// A failed external command propagates its own exit code; everything
    /// else (and signals, or codes that do not fit a byte) maps to `1`.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CommandFailed { code: Some(code), .. } => {
                u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1)
            }
            _ => 1,
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map_or_else(String::new, |c| format!(" with exit code {c}"))
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, FerryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_propagates_exit_code() {
        let err = FerryError::CommandFailed {
            command: "python -m pytest".into(),
            code: Some(5),
        };
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn signal_termination_maps_to_one() {
        let err = FerryError::CommandFailed {
            command: "docker build".into(),
            code: None,
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn out_of_range_code_maps_to_one() {
        let err = FerryError::CommandFailed {
            command: "x".into(),
            code: Some(-1),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn usage_error_exits_one() {
        let err = FerryError::Usage {
            message: "unknown mode: bogus".into(),
            usage: "ferry test [unit|simple|integration]",
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "unknown mode: bogus");
    }

    #[test]
    fn command_failure_message_includes_code() {
        let err = FerryError::CommandFailed {
            command: "git status".into(),
            code: Some(128),
        };
        assert_eq!(
            err.to_string(),
            "command failed with exit code 128: git status"
        );
    }
}
