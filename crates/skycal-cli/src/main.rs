//! CLI entry point for skycal.
//!
//! This binary provides the `skycal` command with subcommands for running
//! the Telegram bot, chatting locally, and checking configuration.

mod bot;
mod chat;
mod cli;
mod config;
mod helpers;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::{AppConfig, Secrets};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Bot { poll_timeout } => bot::cmd_bot(config, poll_timeout).await,
        Commands::Chat { conversation } => chat::cmd_chat(config, conversation).await,
        Commands::Status => cmd_status(&cli.config, &config),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

fn cmd_status(config_path: &std::path::Path, config: &AppConfig) -> Result<()> {
    let secrets = Secrets::from_env();
    let mark = |set: bool| if set { "CONFIGURED" } else { "NOT SET" };

    println!();
    println!("  skycal Status");
    println!("  =============");
    println!();
    if config_path.exists() {
        println!("  Config:           OK ({})", config_path.display());
    } else {
        println!("  Config:           DEFAULTS ({} not found)", config_path.display());
    }
    println!("  Telegram token:   {}", mark(secrets.telegram_token.is_some()));
    println!(
        "  LLM extractor:    {} (model {})",
        mark(secrets.llm_api_key.is_some()),
        config.llm.model
    );
    println!("  OpenWeatherMap:   {}", mark(secrets.openweather_api_key.is_some()));
    println!(
        "  CalDAV calendar:  {}",
        secrets.caldav_url.as_deref().unwrap_or("NOT SET")
    );
    println!();
    println!("  Default location: {}", config.dialogue.default_location);
    println!("  Pending TTL:      {}s", config.dialogue.pending_ttl_secs);
    println!("  Call timeout:     {}s", config.dialogue.collaborator_timeout_secs);
    println!("  Rain keywords:    {}", config.dialogue.rain_keywords.join(", "));
    println!();

    Ok(())
}
