//! Telegram Bot channel: long-polling `getUpdates` + REST API.
//!
//! Receives chat commands and inline-button presses, and delivers in-stock
//! alerts with "open" and "stop alerts" buttons.

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use stockwatch_core::config::TelegramConfig;
use stockwatch_core::error::{Result, StockWatchError};
use stockwatch_core::traits::{Channel, Notifier};
use stockwatch_core::types::{
    Button, ButtonAction, CallbackInfo, IncomingMessage, Notification, OutgoingMessage,
    SubscriberId, ThreadType,
};

const CHANNEL_NAME: &str = "telegram";

/// Telegram Bot channel.
#[derive(Clone)]
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    connected: bool,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        // Long polls hold the request open for poll_timeout_secs.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .unwrap_or_default();

        Self { config, client, connected: false }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    /// Call a Bot API method and return its `result` field.
    pub async fn call(&self, method: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let response = self.client.post(self.api_url(method)).json(&body).send().await
            .map_err(|e| StockWatchError::Channel(format!("Telegram {method} failed: {e}")))?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await
            .map_err(|e| StockWatchError::Channel(format!("Telegram {method} {status}: invalid response: {e}")))?;

        if !payload["ok"].as_bool().unwrap_or(false) {
            let description = payload["description"].as_str().unwrap_or("no description");
            return Err(StockWatchError::Channel(format!("Telegram {method} {status}: {description}")));
        }
        Ok(payload["result"].clone())
    }

    /// Get current bot info.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let result = self.call("getMe", serde_json::json!({})).await?;
        serde_json::from_value(result)
            .map_err(|e| StockWatchError::Channel(format!("Invalid getMe response: {e}")))
    }

    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
        self.call("sendMessage", message_body(message)).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = text.into();
        }
        self.call("answerCallbackQuery", body).await?;
        Ok(())
    }

    pub async fn edit_message_text(&self, chat_id: &str, message_id: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id_value(chat_id),
            "message_id": message_id.parse::<i64>().map(serde_json::Value::from)
                .unwrap_or_else(|_| message_id.into()),
            "text": text,
            "disable_web_page_preview": true,
        });
        self.call("editMessageText", body).await?;
        Ok(())
    }

    /// Drop any webhook so long polling works; optionally discard the
    /// backlog of updates queued while offline.
    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        self.call(
            "deleteWebhook",
            serde_json::json!({ "drop_pending_updates": drop_pending_updates }),
        )
        .await?;
        Ok(())
    }

    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<serde_json::Value>> {
        let mut body = serde_json::json!({
            "timeout": self.config.poll_timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = offset.into();
        }
        let result = self.call("getUpdates", body).await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }

    /// Start the long-polling loop and return a stream of incoming messages.
    /// Network errors are retried with exponential backoff.
    pub fn start_polling(&self) -> TelegramUpdateStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let channel = self.clone();

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 5;
            let mut offset: Option<i64> = None;

            loop {
                let updates = match channel.get_updates(offset).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        tracing::error!("getUpdates failed: {e}, retrying in {backoff_secs}s...");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };
                backoff_secs = 5;

                for update in updates {
                    if let Some(id) = update["update_id"].as_i64() {
                        offset = Some(id + 1);
                    }
                    let Some(msg) = parse_update(&update) else {
                        tracing::trace!("Ignoring update: {update}");
                        continue;
                    };
                    if tx.send(msg).is_err() {
                        tracing::info!("Telegram stream closed (receiver dropped)");
                        return;
                    }
                }

                if tx.is_closed() {
                    return;
                }
            }
        });

        TelegramUpdateStream { rx }
    }
}

/// Stream of incoming Telegram messages from long polling.
pub struct TelegramUpdateStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<IncomingMessage>,
}

impl Stream for TelegramUpdateStream {
    type Item = IncomingMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str { CHANNEL_NAME }

    async fn connect(&mut self) -> Result<()> {
        if self.config.bot_token.trim().is_empty() {
            return Err(StockWatchError::config(
                "telegram.bot_token is not set (or export STOCKWATCH_TELEGRAM_TOKEN)",
            ));
        }
        let me = self.get_me().await?;
        tracing::info!("Telegram bot: @{} ({})", me.username.as_deref().unwrap_or("?"), me.id);

        if self.config.drop_pending_updates {
            self.delete_webhook(true).await?;
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool { self.connected }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.send_message(&message).await
    }

    async fn listen(&self) -> Result<Box<dyn Stream<Item = IncomingMessage> + Send + Unpin>> {
        Ok(Box::new(self.start_polling()))
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.answer_callback_query(callback_id, text).await
    }

    async fn edit_message(&self, thread_id: &str, message_id: &str, content: &str) -> Result<()> {
        self.edit_message_text(thread_id, message_id, content).await
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn notify(&self, subscriber: SubscriberId, notification: &Notification) -> Result<()> {
        self.send_message(&alert_message(subscriber, notification)).await
            .map_err(|e| StockWatchError::delivery(e.to_string()))
    }
}

/// The in-stock alert: text plus "open" and "stop alerts" buttons.
pub fn alert_message(subscriber: SubscriberId, n: &Notification) -> OutgoingMessage {
    let text = format!(
        "🔥 IN STOCK RIGHT NOW!\n\n{}\nPrice: {}\n{}",
        n.display_name, n.price, n.link
    );
    OutgoingMessage::text(subscriber.to_string(), text)
        .with_button_row(vec![Button::url("Open product", n.link.clone())])
        .with_button_row(vec![Button::callback("Stop alerts", n.silence_token.callback_data())])
        .without_preview()
}

/// `sendMessage` request body.
pub fn message_body(message: &OutgoingMessage) -> serde_json::Value {
    let mut body = serde_json::json!({
        "chat_id": chat_id_value(&message.thread_id),
        "text": message.content,
        "disable_web_page_preview": message.disable_preview,
    });
    if !message.buttons.is_empty() {
        body["reply_markup"] = reply_markup(&message.buttons);
    }
    if let Some(reply_to) = message.reply_to.as_deref().and_then(|r| r.parse::<i64>().ok()) {
        body["reply_to_message_id"] = reply_to.into();
    }
    body
}

fn reply_markup(rows: &[Vec<Button>]) -> serde_json::Value {
    let keyboard: Vec<Vec<serde_json::Value>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Url(url) => serde_json::json!({ "text": button.label, "url": url }),
                    ButtonAction::Callback(data) => {
                        serde_json::json!({ "text": button.label, "callback_data": data })
                    }
                })
                .collect()
        })
        .collect();
    serde_json::json!({ "inline_keyboard": keyboard })
}

// Numeric chat ids go out as numbers; `@channelname` stays a string.
fn chat_id_value(chat_id: &str) -> serde_json::Value {
    chat_id
        .parse::<i64>()
        .map(serde_json::Value::from)
        .unwrap_or_else(|_| chat_id.into())
}

/// Map one `getUpdates` entry to an IncomingMessage. Non-text messages and
/// other update kinds yield `None`.
pub fn parse_update(update: &serde_json::Value) -> Option<IncomingMessage> {
    if let Some(query) = update.get("callback_query") {
        let message = &query["message"];
        let chat_id = message["chat"]["id"].as_i64()?;
        let info = CallbackInfo {
            id: query["id"].as_str()?.to_string(),
            message_id: message["message_id"].as_i64().map(|id| id.to_string()),
            data: query["data"].as_str().unwrap_or_default().to_string(),
        };
        let mut msg = IncomingMessage::callback(CHANNEL_NAME, chat_id.to_string(), info);
        msg.sender_id = query["from"]["id"].as_i64().map(|id| id.to_string()).unwrap_or(msg.sender_id);
        msg.sender_name = sender_name(&query["from"]);
        msg.thread_type = thread_type(&message["chat"]);
        return Some(msg);
    }

    let message = update.get("message")?;
    let text = message["text"].as_str()?;
    let chat_id = message["chat"]["id"].as_i64()?;

    Some(IncomingMessage {
        channel: CHANNEL_NAME.into(),
        thread_id: chat_id.to_string(),
        sender_id: message["from"]["id"].as_i64()
            .map(|id| id.to_string())
            .unwrap_or_else(|| chat_id.to_string()),
        sender_name: sender_name(&message["from"]),
        content: text.to_string(),
        thread_type: thread_type(&message["chat"]),
        timestamp: message["date"].as_i64()
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(chrono::Utc::now),
        reply_to: message["reply_to_message"]["message_id"].as_i64().map(|id| id.to_string()),
        callback: None,
    })
}

fn sender_name(from: &serde_json::Value) -> Option<String> {
    from["username"].as_str()
        .or_else(|| from["first_name"].as_str())
        .map(String::from)
}

fn thread_type(chat: &serde_json::Value) -> ThreadType {
    if chat["type"].as_str() == Some("private") {
        ThreadType::Direct
    } else {
        ThreadType::Group
    }
}

// --- Telegram API Types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}
