//! Two-stage build manifest.
//!
//! The builder stage compiles dependencies into an isolated prefix; the
//! runtime stage starts from a fresh base and copies only that prefix and
//! the application source, so no compiler toolchain reaches the final image.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use ferry_common::config::ManifestConfig;
use ferry_common::error::{FerryError, Result};

/// Prefix the builder stage installs dependencies into.
const INSTALL_PREFIX: &str = "/install";

/// Application directory inside the image.
const APP_DIR: &str = "/app";

/// Renders the build manifest for an application listening on `port`.
#[must_use]
pub fn render_manifest(config: &ManifestConfig, port: u16) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# syntax=docker/dockerfile:1");
    let _ = writeln!(out);
    let _ = writeln!(out, "# Stage 1: build dependencies");
    let _ = writeln!(out, "FROM {} AS builder", config.build_base);
    let _ = writeln!(out, "WORKDIR /build");
    let _ = writeln!(out, "{}", apt_install(&config.build_packages));
    let _ = writeln!(out, "COPY {} .", config.requirements);
    let _ = writeln!(
        out,
        "RUN pip install --no-cache-dir --prefix={INSTALL_PREFIX} -r {}",
        config.requirements
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "# Stage 2: runtime");
    let _ = writeln!(out, "FROM {}", config.runtime_base);
    let _ = writeln!(out, "ENV PYTHONDONTWRITEBYTECODE=1 \\");
    let _ = writeln!(out, "    PYTHONUNBUFFERED=1 \\");
    let _ = writeln!(out, "    PORT={port}");
    let _ = writeln!(out, "{}", apt_install(&config.runtime_packages));
    let _ = writeln!(out, "COPY --from=builder {INSTALL_PREFIX} /usr/local");
    let _ = writeln!(out, "WORKDIR {APP_DIR}");
    let _ = writeln!(out, "COPY {}/ .", config.source_dir.trim_end_matches('/'));
    let _ = writeln!(
        out,
        "RUN useradd --create-home --shell /usr/sbin/nologin {user} \\",
        user = config.user
    );
    let _ = writeln!(out, "    && chown -R {user}:{user} {APP_DIR}", user = config.user);
    let _ = writeln!(out, "USER {}", config.user);
    let _ = writeln!(out, "EXPOSE {port}");
    let _ = writeln!(out, "CMD {}", exec_form(&config.command));

    out
}

fn apt_install(packages: &[String]) -> String {
    if packages.is_empty() {
        return "# no system packages".to_string();
    }
    format!(
        "RUN apt-get update \\\n    && apt-get install -y --no-install-recommends {} \\\n    && rm -rf /var/lib/apt/lists/*",
        packages.join(" ")
    )
}

fn exec_form(command: &[String]) -> String {
    let parts: Vec<String> = command
        .iter()
        .map(|part| format!("\"{}\"", part.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("[{}]", parts.join(", "))
}

/// Writes the manifest to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_manifest(path: &Path, config: &ManifestConfig, port: u16) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| FerryError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, render_manifest(config, port)).map_err(|e| FerryError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), "wrote build manifest");
    Ok(())
}

/// Returns the manifest path inside `context`, rendering it first if absent.
///
/// An existing manifest is never overwritten.
///
/// # Errors
///
/// Returns an error if a missing manifest cannot be written.
pub fn ensure_manifest(context: &Path, config: &ManifestConfig, port: u16) -> Result<PathBuf> {
    let path = context.join(ferry_common::constants::MANIFEST_FILE);
    if path.exists() {
        tracing::debug!(path = %path.display(), "using existing manifest");
    } else {
        write_manifest(&path, config, port)?;
    }
    Ok(path)
}
