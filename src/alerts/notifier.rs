//! Alert delivery to chat channels

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use crate::config::{TelegramConfig, REDACTED};

/// Delivers a rendered message to a destination channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// One delivery attempt; no retries
    async fn deliver(&self, channel_id: &str, text: &str) -> Result<(), PipelineError>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    endpoint: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The endpoint embeds the bot token
        f.debug_struct("TelegramNotifier")
            .field("api_base", &self.api_base)
            .field("endpoint", &REDACTED)
            .finish()
    }
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::DeliveryFailed {
                status: None,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        let api_base = api_base.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base, bot_token),
            api_base,
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self, PipelineError> {
        Self::new(&config.api_base, &config.bot_token, config.timeout)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, channel_id: &str, text: &str) -> Result<(), PipelineError> {
        let payload = SendMessage {
            chat_id: channel_id,
            text,
            parse_mode: "MarkdownV2",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::DeliveryFailed {
                status: e.status().map(|s| s.as_u16()),
                // Strip the URL, it embeds the bot token
                body: format!("Failed to send message: {}", e.without_url()),
            })?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => format!("Failed to read response body: {}", e.without_url()),
        };

        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "Telegram rejected message"
            );
            return Err(PipelineError::DeliveryFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(ApiResponse { ok: true, .. }) => {
                tracing::debug!(chat_id = %channel_id, "Telegram message sent");
                Ok(())
            }
            Ok(ApiResponse { description, .. }) => Err(PipelineError::DeliveryFailed {
                status: Some(status.as_u16()),
                body: description.unwrap_or(body),
            }),
            Err(_) => Err(PipelineError::DeliveryFailed {
                status: Some(status.as_u16()),
                body: format!("Unrecognised response: {}", body),
            }),
        }
    }
}
