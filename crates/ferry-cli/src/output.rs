//! Formatted output helpers for CLI commands.
//!
//! Status lines go to stderr with ANSI styling; machine-readable output
//! (rendered files, JSON reports) goes to stdout.

use ferry_common::error::FerryError;

const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Prints a step header.
#[allow(clippy::print_stderr)]
pub fn step(message: &str) {
    eprintln!("{CYAN}==>{RESET} {BOLD}{message}{RESET}");
}

/// Prints a success line.
#[allow(clippy::print_stderr)]
pub fn success(message: &str) {
    eprintln!("{GREEN}✓{RESET} {message}");
}

/// Prints a failure line.
#[allow(clippy::print_stderr)]
pub fn failure(message: &str) {
    eprintln!("{RED}✗{RESET} {message}");
}

/// Writes `content` to stdout as-is.
#[allow(clippy::print_stdout)]
pub fn raw(content: &str) {
    print!("{content}");
}

/// Process exit status for a failed command.
///
/// A failing external command's own code is propagated; everything else
/// exits `1`.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<FerryError>()
        .map_or(1, FerryError::exit_code)
}

/// Lines describing `err` for the terminal.
///
/// Usage errors are followed by their usage line.
pub fn error_lines(err: &anyhow::Error) -> Vec<String> {
    let mut lines = vec![format!("error: {err:#}")];
    if let Some(FerryError::Usage { usage, .. }) = err.downcast_ref::<FerryError>() {
        lines.push((*usage).to_string());
    }
    lines
}

/// Prints `err` to stderr.
#[allow(clippy::print_stderr)]
pub fn report_error(err: &anyhow::Error) {
    for (i, line) in error_lines(err).iter().enumerate() {
        if i == 0 {
            eprintln!("{RED}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}
