//! Synchronous external command execution.
//!
//! Every pipeline step is a blocking call to an external tool. Steps go
//! through the [`Executor`] trait so that the same pipeline code can run
//! for real, be printed as a dry run, or be recorded in tests.

use std::fmt;
use std::path::PathBuf;

use ferry_common::error::{FerryError, Result};

/// A single external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    /// Arguments, passed verbatim (no shell).
    pub args: Vec<String>,
    /// Working directory; inherits the caller's when `None`.
    pub current_dir: Option<PathBuf>,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Indices into `args` that are masked when displayed.
    pub secret_args: Vec<usize>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
            secret_args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends an argument that must not appear in logs or dry-run output.
    ///
    /// A `KEY=value` argument displays as `KEY=***`; anything else as `***`.
    #[must_use]
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret_args.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for (i, arg) in self.args.iter().enumerate() {
            if self.secret_args.contains(&i) {
                match arg.split_once('=') {
                    Some((key, _)) => write!(f, " {}=***", quote(key))?,
                    None => write!(f, " ***")?,
                }
            } else {
                write!(f, " {}", quote(arg))?;
            }
        }
        Ok(())
    }
}

/// Shell-style quoting for display only; commands never pass through a shell.
fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Result of an executed command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Captured standard output (empty when streamed).
    pub stdout: String,
    /// Captured standard error (empty when streamed).
    pub stderr: String,
    /// Exit code, or `None` when terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ExecOutput {
    /// Whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Runs external commands.
pub trait Executor {
    /// Runs a command with inherited stdio, blocking until it exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started. A non-zero exit
    /// is not an error here; see [`Executor::check`].
    fn run(&self, cmd: &CommandSpec) -> Result<ExecOutput>;

    /// Runs a command and captures its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started.
    fn capture(&self, cmd: &CommandSpec) -> Result<ExecOutput>;

    /// Runs a command and fails on a non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::CommandFailed`] carrying the command's exit
    /// code, or the start-up error from [`Executor::run`].
    fn check(&self, cmd: &CommandSpec) -> Result<()> {
        tracing::debug!(command = %cmd, "running");
        let output = self.run(cmd)?;
        if output.success() {
            Ok(())
        } else {
            Err(FerryError::CommandFailed {
                command: cmd.to_string(),
                code: output.exit_code,
            })
        }
    }
}

/// Executor backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    /// Creates a system executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn command(cmd: &CommandSpec) -> Result<std::process::Command> {
        let path = which::which(&cmd.program).map_err(|_| FerryError::ToolNotFound {
            program: cmd.program.clone(),
        })?;
        let mut command = std::process::Command::new(path);
        let _ = command.args(&cmd.args).envs(cmd.env.iter().cloned());
        if let Some(dir) = &cmd.current_dir {
            let _ = command.current_dir(dir);
        }
        Ok(command)
    }
}

impl Executor for SystemExecutor {
    fn run(&self, cmd: &CommandSpec) -> Result<ExecOutput> {
        let status = Self::command(cmd)?
            .status()
            .map_err(|e| FerryError::Io {
                path: cmd.program.clone().into(),
                source: e,
            })?;
        Ok(ExecOutput {
            exit_code: status.code(),
            ..ExecOutput::default()
        })
    }

    fn capture(&self, cmd: &CommandSpec) -> Result<ExecOutput> {
        let output = Self::command(cmd)?
            .output()
            .map_err(|e| FerryError::Io {
                path: cmd.program.clone().into(),
                source: e,
            })?;
        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}
