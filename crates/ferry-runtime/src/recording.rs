//! Executor that records commands instead of running them.
//!
//! Backs `--dry-run` and every pipeline test. Commands succeed with empty
//! output unless a rule scripted with [`RecordingExecutor::fail_when`],
//! [`RecordingExecutor::respond_when`] or [`RecordingExecutor::missing_tool`]
//! matches the rendered command line.

use std::sync::{Mutex, PoisonError};

use ferry_common::error::{FerryError, Result};

use crate::exec::{CommandSpec, ExecOutput, Executor};

#[derive(Debug, Clone)]
enum Reply {
    Exit(i32),
    Stdout(String),
    NotFound,
}

/// Records every command it is asked to run.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    echo: bool,
    rules: Vec<(String, Reply)>,
    commands: Mutex<Vec<CommandSpec>>,
}

impl RecordingExecutor {
    /// Creates a silent recorder where every command succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder that prints each command to stderr, `sh -x` style.
    #[must_use]
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Commands whose rendered line contains `pattern` exit with `code`.
    #[must_use]
    pub fn fail_when(mut self, pattern: impl Into<String>, code: i32) -> Self {
        self.rules.push((pattern.into(), Reply::Exit(code)));
        self
    }

    /// Commands whose rendered line contains `pattern` print `stdout`.
    #[must_use]
    pub fn respond_when(mut self, pattern: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.rules.push((pattern.into(), Reply::Stdout(stdout.into())));
        self
    }

    /// Commands for `program` fail to start as if it were not installed.
    #[must_use]
    pub fn missing_tool(mut self, program: impl Into<String>) -> Self {
        self.rules.push((program.into(), Reply::NotFound));
        self
    }

    /// All recorded commands, in execution order.
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rendered command lines, in execution order.
    pub fn lines(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }

    fn record(&self, cmd: &CommandSpec) -> Result<ExecOutput> {
        let line = cmd.to_string();
        if self.echo {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("+ {line}");
            }
        }
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cmd.clone());

        let reply = self
            .rules
            .iter()
            .find(|(pattern, reply)| match reply {
                Reply::NotFound => cmd.program == *pattern,
                _ => line.contains(pattern.as_str()),
            })
            .map(|(_, reply)| reply.clone());

        match reply {
            None => Ok(ExecOutput {
                exit_code: Some(0),
                ..ExecOutput::default()
            }),
            Some(Reply::Exit(code)) => Ok(ExecOutput {
                exit_code: Some(code),
                ..ExecOutput::default()
            }),
            Some(Reply::Stdout(stdout)) => Ok(ExecOutput {
                stdout,
                exit_code: Some(0),
                ..ExecOutput::default()
            }),
            Some(Reply::NotFound) => Err(FerryError::ToolNotFound {
                program: cmd.program.clone(),
            }),
        }
    }
}

impl Executor for RecordingExecutor {
    fn run(&self, cmd: &CommandSpec) -> Result<ExecOutput> {
        self.record(cmd)
    }

    fn capture(&self, cmd: &CommandSpec) -> Result<ExecOutput> {
        self.record(cmd)
    }
}
