use serde::{Deserialize, Serialize};

use crate::config::TelegramConfig;

/// The parts of a bot api `Update` this bot looks at.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("{method} failed: {}", .response.description.as_deref().unwrap_or("no description"))]
    Api { method: String, response: ApiResponse },
}

#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: config.token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Calls a bot api method with query parameters. A response with
    /// `ok: false` is returned as is, not as an error.
    pub async fn call(
        &self, method: &str, params: &[(&str, String)],
    ) -> Result<ApiResponse, TelegramError> {
        let url = format!("{}/bot{}/{method}", self.api_base, self.token);
        Ok(self.client.get(url)
            .query(params)
            .send().await?
        .json().await?)
    }

    async fn call_ok(
        &self, method: &str, params: &[(&str, String)],
    ) -> Result<ApiResponse, TelegramError> {
        let response = self.call(method, params).await?;
        if response.ok {
            Ok(response)
        } else {
            Err(TelegramError::Api { method: method.into(), response })
        }
    }

    /// Sends a legacy markdown message and removes any custom keyboard.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.call_ok("sendMessage", &[
            ("chat_id", chat_id.to_string()),
            ("text", text.to_string()),
            ("parse_mode", "Markdown".into()),
            ("reply_markup", r#"{"remove_keyboard":true}"#.into()),
        ]).await?;
        Ok(())
    }

    pub async fn set_webhook(&self, url: &str, secret: &str) -> Result<ApiResponse, TelegramError> {
        self.call("setWebhook", &[
            ("url", url.to_string()),
            ("secret_token", secret.to_string()),
        ]).await
    }

    pub async fn delete_webhook(&self) -> Result<ApiResponse, TelegramError> {
        self.call("setWebhook", &[("url", String::new())]).await
    }
}
