//! Subcommand: `skycal bot` -- Telegram bot gateway.
//!
//! Long-polls Telegram for text messages, hands each one to the dialogue
//! service on its own task and sends the reply back.  Turns for the same
//! chat serialize inside the service; different chats run concurrently.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use skycal_adapters::{IncomingMessage, TelegramClient};
use skycal_dialogue::{ConversationId, DialogueService, replies};

use crate::config::{AppConfig, Secrets};
use crate::helpers::{build_service, init_tracing};

/// Run the Telegram bot gateway until the process is stopped.
pub async fn cmd_bot(config: AppConfig, poll_timeout: Option<u64>) -> Result<()> {
    init_tracing("info");
    info!("starting Telegram bot gateway");

    let secrets = Secrets::from_env();
    let token = secrets.require_telegram_token()?;
    let telegram = Arc::new(
        TelegramClient::new(&config.telegram, token).context("failed to create Telegram client")?,
    );

    let bot_name = telegram
        .get_me()
        .await
        .context("Telegram getMe failed, check TELEGRAM_BOT_TOKEN")?;
    info!(bot = %bot_name, "Telegram token verified");

    let service = Arc::new(build_service(&config, &secrets)?);
    let welcome: Arc<str> = replies::welcome(&config.dialogue.default_location).into();

    let poll_timeout = poll_timeout.unwrap_or(config.telegram.poll_timeout_secs);
    let retry_delay = Duration::from_secs(config.telegram.retry_delay_secs);
    let mut offset = match telegram.skip_backlog().await {
        Ok(offset) => {
            info!(offset, "skipped messages queued while offline");
            offset
        }
        Err(e) => {
            warn!(error = %e, "could not skip queued messages, polling from the start");
            0
        }
    };

    info!(poll_timeout, "polling for messages");
    loop {
        let (next, messages) = match telegram.get_updates(offset, poll_timeout).await {
            Ok(polled) => polled,
            Err(e) => {
                warn!(error = %e, "Telegram poll failed, retrying...");
                tokio::time::sleep(retry_delay).await;
                continue;
            }
        };
        offset = next;

        for message in messages {
            let service = Arc::clone(&service);
            let telegram = Arc::clone(&telegram);
            let welcome = Arc::clone(&welcome);
            tokio::spawn(async move {
                handle_update(&service, &telegram, &welcome, message).await;
            });
        }
    }
}

async fn handle_update(
    service: &DialogueService,
    telegram: &TelegramClient,
    welcome: &str,
    message: IncomingMessage,
) {
    let chat_id = message.chat_id;

    let reply = if message.text == "/start" {
        info!(chat_id, "start command");
        welcome.to_owned()
    } else {
        service
            .handle_message(ConversationId(chat_id), &message.text)
            .await
            .text
    };

    if let Err(e) = telegram.send_message(chat_id, &reply).await {
        warn!(chat_id, error = %e, "failed to deliver reply");
    }
}
