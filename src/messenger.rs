use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile};

/// Outbound messaging primitives used by the relay and the command bot.
///
/// Production code uses [`TelegramMessenger`]; tests substitute a recording mock.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    async fn send_photo(&self, chat_id: i64, data: Bytes, filename: &str) -> Result<()>;

    async fn send_video(&self, chat_id: i64, data: Bytes, filename: &str) -> Result<()>;

    async fn send_audio(&self, chat_id: i64, data: Bytes, filename: &str) -> Result<()>;

    async fn send_document(&self, chat_id: i64, data: Bytes, filename: &str) -> Result<()>;
}

/// Wraps a `teloxide::Bot`. Built once per process and shared.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(token: &str) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn upload(data: Bytes, filename: &str) -> InputFile {
        InputFile::memory(data.to_vec()).file_name(filename.to_string())
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text.to_string())
            .await
            .context("sendMessage failed")?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, data: Bytes, filename: &str) -> Result<()> {
        self.bot
            .send_photo(ChatId(chat_id), Self::upload(data, filename))
            .await
            .context("sendPhoto failed")?;
        Ok(())
    }

    async fn send_video(&self, chat_id: i64, data: Bytes, filename: &str) -> Result<()> {
        self.bot
            .send_video(ChatId(chat_id), Self::upload(data, filename))
            .await
            .context("sendVideo failed")?;
        Ok(())
    }

    async fn send_audio(&self, chat_id: i64, data: Bytes, filename: &str) -> Result<()> {
        self.bot
            .send_audio(ChatId(chat_id), Self::upload(data, filename))
            .await
            .context("sendAudio failed")?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, data: Bytes, filename: &str) -> Result<()> {
        self.bot
            .send_document(ChatId(chat_id), Self::upload(data, filename))
            .await
            .context("sendDocument failed")?;
        Ok(())
    }
}
