//! CLI argument parsing for links.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "links",
    about = "Client for the clink Links Theory database",
    version,
    after_help = "Logs are written to <data-dir>/logs/links.log (filter with RUST_LOG)"
)]
pub struct Cli {
    /// Link database file (default: <data-dir>/linkdb.links)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Directory for side-car data and logs
    #[arg(short = 'd', long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// clink program name or path
    #[arg(long, global = true)]
    pub clink: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check that clink is installed and runnable
    Health,

    /// Create a link
    Create { source: u64, target: u64 },

    /// List all links
    List,

    /// Get a link by ID
    Get { id: u64 },

    /// Point a link at a new source and target
    Update { id: u64, source: u64, target: u64 },

    /// Delete a link by ID
    Delete { id: u64 },

    /// Count links matching a restriction (0 = any)
    Count {
        #[arg(long, default_value = "0")]
        id: u64,

        #[arg(long, default_value = "0")]
        source: u64,

        #[arg(long, default_value = "0")]
        target: u64,
    },

    /// Delete every link
    Clear,

    /// Menu storage
    Menu {
        #[command(subcommand)]
        command: MenuCommand,
    },

    /// Auth storage
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand)]
pub enum MenuCommand {
    /// Store a menu tree from a JSON or YAML file
    Store {
        file: PathBuf,

        /// Parent item ID (0 = root)
        #[arg(short, long, default_value = "0")]
        parent: u64,
    },

    /// Print the stored menu tree as JSON
    Show {
        #[arg(short, long, default_value = "0")]
        parent: u64,
    },

    /// Show link and file counts
    Stats,

    /// Remove all menu links and files
    Clear,
}

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Show per-entity link and file counts
    Stats,

    /// List users
    Users,
}
