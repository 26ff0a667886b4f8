//! Invocation of the external clink binary.

use crate::config::{LinksConfig, ensure_parent};
use crate::error::LinksError;
use crate::query::QueryFlags;
use eyre::{Context, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Something that can run a Links Notation query against a store.
pub trait Executor: Send + Sync {
    /// Run `query` and return its trimmed standard output.
    fn execute(&self, query: &str, flags: QueryFlags) -> Result<String>;

    /// Probe whether the backing tool can be used.
    fn health_check(&self) -> Capability;
}

/// Result of a health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub available: bool,
    pub program: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Capability {
    pub fn available(program: impl Into<String>, version: Option<String>) -> Self {
        Self {
            available: true,
            program: program.into(),
            version,
            error: None,
        }
    }

    pub fn unavailable(program: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            available: false,
            program: program.into(),
            version: None,
            error: Some(error.into()),
        }
    }
}

/// Runs clink as a subprocess, one process per query.
#[derive(Debug, Clone)]
pub struct Clink {
    program: String,
    db_path: PathBuf,
    search_dirs: Vec<PathBuf>,
}

impl Clink {
    pub fn new(program: impl Into<String>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            db_path: db_path.into(),
            search_dirs: Vec::new(),
        }
    }

    pub fn from_config(config: &LinksConfig) -> Self {
        Self {
            program: config.program.clone(),
            db_path: config.db_path.clone(),
            search_dirs: config.search_dirs.clone(),
        }
    }

    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Resolve the program against the search dirs and `PATH`.
    pub fn resolve_program(&self) -> Option<PathBuf> {
        resolve_command(&self.program, &self.search_dirs)
    }

    /// `PATH` for the child: search dirs first, then the inherited value.
    fn child_path(&self) -> Option<OsString> {
        let inherited = std::env::var_os("PATH");
        let dirs = self
            .search_dirs
            .iter()
            .cloned()
            .chain(inherited.iter().flat_map(std::env::split_paths));
        std::env::join_paths(dirs).ok()
    }

    fn command(&self) -> Command {
        let program = self
            .resolve_program()
            .map(PathBuf::into_os_string)
            .unwrap_or_else(|| OsString::from(&self.program));
        let mut cmd = Command::new(program);
        if let Some(path) = self.child_path() {
            cmd.env("PATH", path);
        }
        cmd.stdin(Stdio::null());
        cmd
    }

    fn run(&self, mut cmd: Command) -> Result<Output> {
        match cmd.output() {
            Ok(output) => Ok(output),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::error!("{} command not found - link-cli may not be installed", self.program);
                Err(eyre::eyre!(LinksError::ToolNotFound {
                    program: self.program.clone(),
                }))
            }
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to spawn {}", self.program)),
        }
    }
}

impl Executor for Clink {
    fn execute(&self, query: &str, flags: QueryFlags) -> Result<String> {
        ensure_parent(&self.db_path)
            .wrap_err_with(|| format!("Failed to create database directory for {}", self.db_path.display()))?;

        let mut cmd = self.command();
        cmd.arg(query).arg("--db").arg(&self.db_path).args(flags.args());

        log::debug!(
            "Executing clink command: {} {:?} --db {} {}",
            self.program,
            query,
            self.db_path.display(),
            flags.args().join(" ")
        );

        let output = self.run(cmd)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            if is_missing_command(&stderr) {
                log::error!("{} command not found: {}", self.program, stderr.trim());
                return Err(eyre::eyre!(LinksError::ToolNotFound {
                    program: self.program.clone(),
                }));
            }
            log::error!("Failed to execute clink command: {}", stderr.trim());
            return Err(eyre::eyre!(LinksError::ProcessFailed {
                code: output.status.code(),
                stderr: stderr.into_owned(),
            }));
        }

        if !stderr.trim().is_empty() {
            log::warn!("clink command produced stderr: {}", stderr.trim());
        }

        Ok(stdout.trim().to_string())
    }

    fn health_check(&self) -> Capability {
        let mut cmd = self.command();
        cmd.arg("--version");

        match self.run(cmd) {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Capability::available(&self.program, Some(version).filter(|v| !v.is_empty()))
            }
            Ok(output) => Capability::unavailable(
                &self.program,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ),
            Err(e) => Capability::unavailable(&self.program, e.to_string()),
        }
    }
}

fn is_missing_command(stderr: &str) -> bool {
    stderr.to_lowercase().contains("command not found")
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && (m.permissions().mode() & 0o111 != 0))
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Find `name` in `dirs`, then in `PATH`. Names containing a separator are
/// taken as paths.
fn resolve_command(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }

    let path_var = std::env::var_os("PATH");
    dirs.iter()
        .cloned()
        .chain(path_var.iter().flat_map(std::env::split_paths))
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}
