use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Run instruction scripts through a shuttle queue.
#[derive(Parser, Debug)]
#[command(name = "shuttle", about = "Priority instruction queue runner")]
pub struct CliArgs {
    /// Path to a JSON queue config (defaults are used when omitted)
    #[arg(long, env = "SHUTTLE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Enqueue a script of instructions and wait for the queue to drain
    Run {
        /// JSON array of `{ "payload", "priority", "parent" }` entries;
        /// a built-in demo runs when omitted
        #[arg(long)]
        script: Option<PathBuf>,

        /// Give up waiting after this many seconds
        #[arg(long, default_value = "60")]
        wait_secs: u64,
    },

    /// Print the effective configuration as JSON
    Config,
}
