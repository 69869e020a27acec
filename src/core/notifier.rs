//! Telegram delivery: `sendMessage` / `getUpdates` over the Bot API,
//! grounded on the teacher's isahc `HttpClient` usage in
//! `core/network/http_monitor.rs` (one long-lived client, JSON body,
//! `send_async`), generalized from status-line API calls to bot-API calls.

use async_trait::async_trait;
use isahc::config::Configurable;
use isahc::{AsyncReadResponseExt, HttpClient, Request};
use serde::Deserialize;
use serde_json::json;

use crate::core::formatter::{self, MAX_MESSAGE_CHARS};

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("telegram API request failed: {0}")]
    Request(String),
    #[error("telegram API returned an error: {0}")]
    Api(String),
}

#[async_trait]
pub trait NotifierClient: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifierError>;
    async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>, NotifierError>;
}

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub text: Option<String>,
    pub chat: TelegramChat,
    pub from: Option<TelegramUser>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub username: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

pub struct TelegramNotifier {
    client: HttpClient,
    bot_token: String,
}

impl TelegramNotifier {
    /// The client's base timeout covers `sendMessage` calls (spec.md §6.3);
    /// `getUpdates`'s long-poll overrides this per-request.
    pub fn new(bot_token: String) -> Result<Self, isahc::Error> {
        let client = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(10))
            .cookies()
            .build()?;
        Ok(Self { client, bot_token })
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Send `text`, paginating first and retrying each page once without
    /// Markdown parsing if Telegram rejects malformed entities (HTTP 400),
    /// per spec.md §6.3.
    async fn send_page(&self, chat_id: &str, text: &str) -> Result<(), NotifierError> {
        let truncated: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
        match self.post_message(chat_id, &truncated, true).await {
            Ok(()) => Ok(()),
            Err(NotifierError::Api(_)) => self.post_message(chat_id, &truncated, false).await,
            Err(e) => Err(e),
        }
    }

    async fn post_message(&self, chat_id: &str, text: &str, use_markdown: bool) -> Result<(), NotifierError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if use_markdown {
            body["parse_mode"] = json!("Markdown");
        }

        let request = Request::post(self.api_url("sendMessage"))
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .map_err(|e| NotifierError::Request(e.to_string()))?;

        let mut response = self
            .client
            .send_async(request)
            .await
            .map_err(|e| NotifierError::Request(e.to_string()))?;

        let raw = response
            .text()
            .await
            .map_err(|e| NotifierError::Request(e.to_string()))?;
        let parsed: ApiResponse<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|e| NotifierError::Request(e.to_string()))?;

        if parsed.ok {
            Ok(())
        } else {
            Err(NotifierError::Api(parsed.description.unwrap_or_else(|| raw.clone())))
        }
    }
}

#[async_trait]
impl NotifierClient for TelegramNotifier {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifierError> {
        for page in formatter::paginate(text) {
            self.send_page(chat_id, &page).await?;
        }
        Ok(())
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>, NotifierError> {
        // Long-poll: ask Telegram to hold the connection open for up to 25s,
        // and give the client 5s of slack on top of that (spec.md §6.3/§4.H).
        let url = format!("{}?offset={offset}&timeout=25", self.api_url("getUpdates"));
        let request = Request::get(url)
            .timeout(std::time::Duration::from_secs(30))
            .body(())
            .map_err(|e| NotifierError::Request(e.to_string()))?;
        let mut response = self
            .client
            .send_async(request)
            .await
            .map_err(|e| NotifierError::Request(e.to_string()))?;
        let raw = response
            .text()
            .await
            .map_err(|e| NotifierError::Request(e.to_string()))?;
        let parsed: ApiResponse<Vec<TelegramUpdate>> =
            serde_json::from_str(&raw).map_err(|e| NotifierError::Request(e.to_string()))?;
        if parsed.ok {
            Ok(parsed.result.unwrap_or_default())
        } else {
            Err(NotifierError::Api(parsed.description.unwrap_or_else(|| raw.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_embeds_bot_token() {
        let notifier = TelegramNotifier::new("12345:abc".to_string()).unwrap();
        assert_eq!(
            notifier.api_url("sendMessage"),
            "https://api.telegram.org/bot12345:abc/sendMessage"
        );
    }
}
