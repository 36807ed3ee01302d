use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Check for and install MDviewer updates.
#[derive(Debug, Parser)]
#[command(name = "mdviewer-updater", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Installation root (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Repository as owner/name or GitHub URL.
    #[arg(long = "repo", global = true, value_name = "ID")]
    pub repository: Option<String>,

    /// Branch to track for checkout installs.
    #[arg(long, global = true, value_name = "NAME")]
    pub branch: Option<String>,

    /// Log external command output to the terminal and the log file.
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Report whether a newer release is available.
    Check,
    /// Check, then install the newer release if there is one.
    Update,
    /// Show installation kind, version and repository state.
    Status,
}
