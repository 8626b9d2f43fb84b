//! Subcommand: `skycal chat` -- local chat on stdin.
//!
//! Drives the same dialogue service as the bot, one line per message, so
//! the full flow can be tried without a Telegram token.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use skycal_dialogue::{ConversationId, replies};

use crate::config::{AppConfig, Secrets};
use crate::helpers::{build_service, init_tracing};

/// Run the interactive chat loop until EOF or `/quit`.
pub async fn cmd_chat(config: AppConfig, conversation: i64) -> Result<()> {
    init_tracing("warn");

    let service = build_service(&config, &Secrets::from_env())?;
    let conversation = ConversationId(conversation);
    info!(conversation_id = %conversation, "chat session started");

    println!();
    println!("{}", replies::welcome(&config.dialogue.default_location));
    println!();
    println!("  Type /quit to exit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt();
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let text = line.trim();
        match text {
            "/quit" | "/exit" => break,
            t if t.chars().count() < 2 => continue,
            t => {
                let reply = service.handle_message(conversation, t).await;
                println!();
                println!("{}", reply.text);
                println!();
            }
        }
    }

    println!("Bye!");
    Ok(())
}

fn print_prompt() {
    use std::io::Write as _;

    print!("you> ");
    let _ = std::io::stdout().flush();
}
