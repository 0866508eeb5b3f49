use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::{
    bot::Bot,
    telegram::{TelegramClient, Update},
};

use super::today;

pub const UPDATE_PATH: &str = "/webhook/update";
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct Webhook {
    pub bot: Bot,
    pub telegram: TelegramClient,
    /// callers of register/unregister must send it as `Authorization`
    pub token: String,
    pub secret: String,
}

fn not_configured() -> (StatusCode, Json<Value>) {
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "bot_not_configured" })))
}

fn header_is(headers: &HeaderMap, name: impl header::AsHeaderName, expected: &str) -> bool {
    headers.get(name).is_some_and(|v| v.as_bytes() == expected.as_bytes())
}

pub async fn update(
    State(webhook): State<Option<Webhook>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let Some(webhook) = webhook else {
        return (StatusCode::SERVICE_UNAVAILABLE, "bot_not_configured".into());
    };
    if !header_is(&headers, SECRET_HEADER, &webhook.secret) {
        tracing::warn!("rejected update with missing or wrong secret");
        return (StatusCode::FORBIDDEN, "Unauthorized".into());
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!("could not read update: {err}");
            return (StatusCode::BAD_REQUEST, "invalid_update".into());
        },
    };

    let Some(message) = update.message else {
        tracing::debug!("ignoring update {} without message", update.update_id);
        return (StatusCode::OK, "ok".into());
    };

    for out in webhook.bot.handle_message(&message, today()).await {
        if let Err(err) = webhook.telegram.send_message(out.chat_id, &out.text).await {
            tracing::error!("could not send message to {}: {err}", out.chat_id);
        }
    }

    (StatusCode::OK, "ok".into())
}

pub async fn register(
    State(webhook): State<Option<Webhook>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let Some(webhook) = webhook else { return not_configured() };
    if !header_is(&headers, header::AUTHORIZATION, &webhook.token) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })));
    }

    let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "missing host" })));
    };
    // telegram only delivers to https
    let url = format!("https://{host}{UPDATE_PATH}");

    match webhook.telegram.set_webhook(&url, &webhook.secret).await {
        Ok(r) if r.ok => {
            tracing::info!("registered webhook at {url}");
            (StatusCode::OK, Json(json!({ "status": "ok", "webhookUrl": url })))
        },
        Ok(r) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
            "error": "Failed to register webhook",
            "response": r,
            "webhookUrl": url,
        }))),
        Err(err) => {
            tracing::error!("could not register webhook: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
                "error": "Failed to register webhook",
                "webhookUrl": url,
            })))
        },
    }
}

pub async fn unregister(
    State(webhook): State<Option<Webhook>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let Some(webhook) = webhook else { return not_configured() };
    if !header_is(&headers, header::AUTHORIZATION, &webhook.token) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })));
    }

    match webhook.telegram.delete_webhook().await {
        Ok(r) if r.ok => {
            tracing::info!("unregistered webhook");
            (StatusCode::OK, Json(json!({ "status": "ok" })))
        },
        Ok(r) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
            "error": "Failed to unregister webhook",
            "response": r,
        }))),
        Err(err) => {
            tracing::error!("could not unregister webhook: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
                "error": "Failed to unregister webhook",
            })))
        },
    }
}
