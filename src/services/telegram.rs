//! Telegram transport for admin notifications.
//!
//! The dispatcher depends only on the `NotifyTransport` trait; this is
//! the Bot API implementation sending to every configured admin chat.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::{
    config::TelegramConfig,
    error::{AppError, AppResult},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotifyTransport: Send + Sync {
    /// Deliver one text message to the admin audience
    async fn send_text(&self, text: &str) -> AppResult<()>;
}

pub struct TelegramTransport {
    config: TelegramConfig,
    client: Client,
}

impl TelegramTransport {
    pub fn new(config: TelegramConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl NotifyTransport for TelegramTransport {
    async fn send_text(&self, text: &str) -> AppResult<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.bot_token
        );

        for chat_id in &self.config.admin_chat_ids {
            let response = self
                .client
                .post(&url)
                .json(&json!({ "chat_id": chat_id, "text": text }))
                .send()
                .await
                .map_err(|e| AppError::Internal(format!("Telegram request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(AppError::Internal(format!(
                    "Telegram API returned {} for chat {}",
                    response.status(),
                    chat_id
                )));
            }
        }

        Ok(())
    }
}
