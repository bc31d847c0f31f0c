//! Telegram notification sink using teloxide.

use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::warn;

use crate::bot::notify::NotificationSink;

/// Mirrors activity into one Telegram chat.
pub struct TelegramSink {
    bot: Bot,
    chat_id: String,
}

impl TelegramSink {
    /// `chat_id` is kept as configured and parsed at send time, so a bad
    /// value only fails the individual sends.
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self {
            bot: Bot::new(token),
            chat_id: chat_id.trim().to_string(),
        }
    }

    fn chat(&self) -> Result<ChatId, String> {
        parse_chat_id(&self.chat_id).map(ChatId)
    }
}

fn parse_chat_id(raw: &str) -> Result<i64, String> {
    raw.parse::<i64>()
        .map_err(|e| format!("Invalid Telegram chat id {raw:?}: {e}"))
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send_text(&self, text: &str) -> Result<(), String> {
        let chat = self.chat()?;
        self.bot
            .send_message(chat, text)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn send_image(&self, path: &Path) -> Result<(), String> {
        let chat = self.chat()?;
        self.bot
            .send_photo(chat, InputFile::file(path))
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to send photo: {e}");
                warn!("{}", msg);
                msg
            })
    }
}
