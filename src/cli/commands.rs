//! CLI command definitions using clap.
//!
//! Two subcommands:
//! - send: run a dispatch batch
//! - status: print the current status snapshot

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sendr - batch direct-message dispatcher
#[derive(Parser, Debug)]
#[command(name = "sendr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a dispatch batch
    Send {
        /// Skip recipients below this 0-based index
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Maximum number of attempted sends (0 = all)
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Rebuild the status file before sending
        #[arg(long)]
        reset: bool,

        /// Run the browser without a visible window
        #[arg(long)]
        headless: bool,

        /// Don't touch the channel; confirm every send locally
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the current status snapshot
    Status {
        /// Show one line per recipient
        #[arg(short, long)]
        detailed: bool,
    },
}
