//! CLI argument definitions for skycal.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// skycal -- a weather-aware scheduling assistant.
#[derive(Parser)]
#[command(
    name = "skycal",
    version,
    about = "skycal -- weather-aware scheduling assistant",
    long_about = "A chat assistant that turns messages like \"run tomorrow at 3pm\" into \
                  calendar events, checking the forecast first and asking when it is unsure."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Telegram bot gateway.
    Bot {
        /// Telegram long-polling timeout in seconds.  Overrides the config.
        #[arg(long)]
        poll_timeout: Option<u64>,
    },

    /// Chat with the assistant on stdin, using the live collaborators.
    Chat {
        /// Conversation id to use for the session.
        #[arg(long, default_value_t = 1)]
        conversation: i64,
    },

    /// Show which collaborators are configured.
    Status,
}
