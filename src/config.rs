//! Locations of the link database, side-car data and the clink program.

use std::path::{Path, PathBuf};

/// Default program name of link-cli.
pub const DEFAULT_PROGRAM: &str = "clink";

/// Link database file within the data directory.
const DB_FILE: &str = "linkdb.links";

/// Directory holding one JSON file per menu item.
const MENU_DIR: &str = "menu-items";

/// Directory holding users, tokens, passwords and their link database.
const AUTH_DIR: &str = "auth-data";

/// Link database for auth records, within `AUTH_DIR`.
const AUTH_DB_FILE: &str = "auth.links";

/// CLI log file, within the data directory.
const LOG_FILE: &str = "logs/links.log";

/// Directory name under the platform data dir.
const APP_DIR: &str = "links-client";

/// Configuration shared by every service.
#[derive(Debug, Clone)]
pub struct LinksConfig {
    /// Root directory for side-car data files
    pub data_dir: PathBuf,

    /// Link database passed to clink via `--db`
    pub db_path: PathBuf,

    /// Program name or path of the clink binary
    pub program: String,

    /// Directories searched before `PATH` (dotnet global tools by default)
    pub search_dirs: Vec<PathBuf>,
}

impl LinksConfig {
    /// Create config rooted at `data_dir` with default settings.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            db_path: data_dir.join(DB_FILE),
            data_dir,
            program: DEFAULT_PROGRAM.to_string(),
            search_dirs: default_search_dirs(),
        }
    }

    /// Config with the platform data directory, overridden by `LINKS_DATA_DIR`,
    /// `LINKS_DB_PATH` and `CLINK_BIN`.
    pub fn from_env() -> Self {
        let data_dir = env_path("LINKS_DATA_DIR").unwrap_or_else(default_data_dir);
        let mut config = Self::new(data_dir);
        if let Some(db_path) = env_path("LINKS_DB_PATH") {
            config.db_path = db_path;
        }
        if let Ok(program) = std::env::var("CLINK_BIN")
            && !program.trim().is_empty()
        {
            config.program = program.trim().to_string();
        }
        config
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Directory of menu item files.
    pub fn menu_dir(&self) -> PathBuf {
        self.data_dir.join(MENU_DIR)
    }

    /// Root directory of auth data.
    pub fn auth_dir(&self) -> PathBuf {
        self.data_dir.join(AUTH_DIR)
    }

    /// Link database used for auth records.
    pub fn auth_db_path(&self) -> PathBuf {
        self.auth_dir().join(AUTH_DB_FILE)
    }

    /// Log file the CLI appends to.
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_search_dirs() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| vec![home.join(".dotnet").join("tools")])
        .unwrap_or_default()
}

/// Ensure the parent directory of a database file exists.
pub(crate) fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
