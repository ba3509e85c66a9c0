//! Telegram Bot API channel: long-polled `getUpdates` in, `sendMessage` out.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use subnet::{CommandSource, Inbound, Notifier};

const API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_SECS: u64 = 25;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub channel_post: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Clone)]
pub struct TelegramApi {
    http: Client,
    base_url: String,
    default_chat: Option<i64>,
}

impl TelegramApi {
    pub fn new(token: &str, default_chat: Option<i64>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", API_BASE, token),
            default_chat,
        })
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.base_url);
        let response: ApiResponse<Vec<Update>> = self
            .http
            .get(url)
            .query(&[("offset", offset), ("timeout", LONG_POLL_SECS as i64)])
            .send()
            .await
            .context("getUpdates request failed")?
            .json()
            .await
            .context("getUpdates returned malformed JSON")?;

        if !response.ok {
            bail!(
                "getUpdates rejected: {}",
                response.description.unwrap_or_default()
            );
        }
        Ok(response.result.unwrap_or_default())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("{}/sendMessage", self.base_url);
        self.http
            .post(url)
            .json(&SendMessage {
                chat_id,
                text,
                parse_mode: "Markdown",
            })
            .send()
            .await
            .context("sendMessage request failed")?
            .error_for_status()
            .context("sendMessage rejected")?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramApi {
    async fn send(&self, chat_id: Option<i64>, text: &str) -> Result<()> {
        match chat_id.or(self.default_chat) {
            Some(chat_id) => self.send_message(chat_id, text).await,
            None => {
                warn!("No chat to send to, dropping message: {}", text);
                Ok(())
            }
        }
    }
}

/// Turns a batch of updates into commands.
///
/// Returns the offset that acknowledges every update in the batch. Only text
/// messages from `allowed_chat` are kept when it is set.
pub fn commands_from_updates(
    updates: &[Update],
    allowed_chat: Option<i64>,
    offset: i64,
) -> (i64, Vec<Inbound>) {
    let mut next_offset = offset;
    let mut batch = Vec::new();

    for update in updates {
        next_offset = next_offset.max(update.update_id + 1);

        let Some(message) = update.message.as_ref().or(update.channel_post.as_ref()) else {
            continue;
        };
        if allowed_chat.is_some_and(|chat| chat != message.chat.id) {
            warn!("Ignoring message from chat {}", message.chat.id);
            continue;
        }
        if let Some(inbound) = message
            .text
            .as_deref()
            .and_then(|text| Inbound::from_text(text, Some(message.chat.id)))
        {
            batch.push(inbound);
        }
    }
    (next_offset, batch)
}

pub struct TelegramPoller {
    api: TelegramApi,
    allowed_chat: Option<i64>,
    offset: i64,
}

impl TelegramPoller {
    pub fn new(api: TelegramApi, allowed_chat: Option<i64>) -> Self {
        Self {
            api,
            allowed_chat,
            offset: 0,
        }
    }
}

#[async_trait]
impl CommandSource for TelegramPoller {
    async fn next_batch(&mut self) -> Result<Vec<Inbound>> {
        let updates = self.api.get_updates(self.offset).await?;
        debug!("Received {} update(s)", updates.len());

        let (offset, batch) = commands_from_updates(&updates, self.allowed_chat, self.offset);
        self.offset = offset;
        Ok(batch)
    }
}
