//! Quell CLI library — exposed for integration tests

pub mod commands;
pub mod output;
#[allow(dead_code)]
pub mod progress;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quell")]
#[command(about = "Silence known findings across scan engines, and keep them silenced", long_about = None)]
#[command(version = quell_core::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Only run these engine kinds (oss, secrets, iac, quality, container)
    #[arg(long, value_delimiter = ',', global = true)]
    pub engine: Option<Vec<String>>,

    /// Output format
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Severity threshold for non-zero exit: malicious, critical, high,
    /// medium, low, unknown, ok, or never
    #[arg(long, global = true)]
    pub fail_on: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize .quell.toml configuration
    Init {
        /// Path to initialize (default: current directory)
        path: Option<PathBuf>,
    },

    /// Scan engine targets and present findings (default command)
    Scan {
        /// Path to workspace (default: current directory)
        path: Option<PathBuf>,
    },

    /// Watch for file changes and re-scan continuously
    Watch {
        /// Path to workspace (default: current directory)
        path: Option<PathBuf>,

        /// Debounce duration in milliseconds (overrides config)
        #[arg(long)]
        debounce: Option<u64>,

        /// Don't clear screen between runs
        #[arg(long)]
        no_clear: bool,
    },

    /// Add a suppression for one finding identity
    Ignore {
        #[command(subcommand)]
        target: commands::ignore::IgnoreTarget,
    },

    /// Inspect and manage the ignore registry
    Ignores {
        #[command(subcommand)]
        action: Option<commands::ignores::IgnoresAction>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Json,
}
