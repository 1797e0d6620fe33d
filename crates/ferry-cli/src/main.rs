//! # ferry — build, verify, and ship the web service
//!
//! Single binary replacing the image build script, the test runner, and
//! the deploy script. Each subcommand is an independent entry point.

mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;

use crate::commands::Cli;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match commands::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::report_error(&err);
            ExitCode::from(output::exit_code(&err))
        }
    }
}
