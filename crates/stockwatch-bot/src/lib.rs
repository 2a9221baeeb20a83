//! # StockWatch Bot
//! Chat-command front end: turns incoming messages and button presses into
//! supervisor calls and replies.
//!
//! | Input | Action |
//! |-------|--------|
//! | `/start`, `/help` | usage |
//! | `/add <url>` | start watching |
//! | `/list` | fresh status of every tracked product |
//! | `/remove <url>` | stop watching |
//! | `stop_<token>` button | stop watching the alerted product |

pub mod commands;

use std::sync::Arc;

use stockwatch_core::error::{Result, StockWatchError};
use stockwatch_core::traits::Channel;
use stockwatch_core::types::{Availability, IncomingMessage, NotificationToken, OutgoingMessage, SubscriberId};
use stockwatch_monitor::Supervisor;
use tokio_stream::StreamExt;

pub use commands::Command;

/// What the runtime should do in response to one incoming message.
#[derive(Debug, Clone)]
pub enum BotReply {
    Send(OutgoingMessage),
    /// Acknowledge a button press, optionally rewriting the message the
    /// button belongs to.
    Callback {
        callback_id: String,
        thread_id: String,
        message_id: Option<String>,
        edit: Option<String>,
    },
    None,
}

pub struct BotHandler {
    supervisor: Arc<Supervisor>,
}

impl BotHandler {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self { supervisor }
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    /// Handle one incoming message.
    pub async fn handle(&self, msg: &IncomingMessage) -> Result<BotReply> {
        let Ok(chat_id) = msg.thread_id.parse::<i64>() else {
            tracing::warn!("Ignoring message from non-numeric chat {}", msg.thread_id);
            return Ok(BotReply::None);
        };
        let subscriber = SubscriberId(chat_id);

        if let Some(callback) = &msg.callback {
            let edit = match NotificationToken::from_callback(&callback.data) {
                Some(token) => self
                    .supervisor
                    .stop_watching_by_token(subscriber, &token)
                    .await?
                    .map(|url| format!("Alerts stopped and link removed:\n{url}")),
                None => None,
            };
            return Ok(BotReply::Callback {
                callback_id: callback.id.clone(),
                thread_id: msg.thread_id.clone(),
                message_id: callback.message_id.clone(),
                edit,
            });
        }

        let text = match Command::parse(&msg.content) {
            Some(Command::Start) | Some(Command::Help) => self.usage(),
            Some(Command::Add(None)) => "Example: /add https://shop.example/product-page".to_string(),
            Some(Command::Add(Some(url))) => self.add(subscriber, &url).await,
            Some(Command::List) => self.list(subscriber).await?,
            Some(Command::Remove(None)) => "Give me the link: /remove https://...".to_string(),
            Some(Command::Remove(Some(url))) => {
                self.supervisor.stop_watching(subscriber, &url).await?;
                format!("Removed from tracking:\n{url}")
            }
            Some(Command::Unknown(_)) | None => {
                "I only understand /add, /list and /remove. Send /help for details.".to_string()
            }
        };

        Ok(BotReply::Send(OutgoingMessage::text(&msg.thread_id, text).without_preview()))
    }

    fn usage(&self) -> String {
        format!(
            "Bot is running!\n\n\
             When a product comes in stock I will message you EVERY {} SECONDS \
             for as long as it stays in stock.\n\n\
             /add https://...\n/list\n/remove https://...",
            self.supervisor.config().check_interval().as_secs()
        )
    }

    async fn add(&self, subscriber: SubscriberId, url: &str) -> String {
        match self.supervisor.start_watching(subscriber, url).await {
            Ok(started) => {
                let status = if started.probe.in_stock { "IN STOCK" } else { "out of stock" };
                format!(
                    "Now tracking:\n{}\nNow: {status}\nPrice: {}",
                    started.probe.display_name, started.probe.price
                )
            }
            Err(StockWatchError::InvalidResource(e)) => {
                tracing::debug!("Rejected /add from {subscriber}: {e}");
                format!("That does not look like a product link:\n{url}")
            }
            Err(e) => {
                tracing::info!("Could not start watching {url} for {subscriber}: {e}");
                format!("Could not open the page:\n{url}")
            }
        }
    }

    async fn list(&self, subscriber: SubscriberId) -> Result<String> {
        let items = self.supervisor.list_watched(subscriber).await?;
        if items.is_empty() {
            return Ok("No tracked products.".to_string());
        }

        let mut text = String::from("Your products (alerts repeat while in stock):\n\n");
        for item in items {
            let marker = match item.status {
                Availability::Available => "✅ IN STOCK",
                Availability::Unavailable => "❌ no",
                Availability::Unknown => "❔ unknown",
            };
            text.push_str(&format!("{marker} {}\n{}\n\n", item.display_name, item.resource));
        }
        Ok(text.trim_end().to_string())
    }

    /// Listen on the channel until its stream ends. Each message is handled
    /// on its own task so a slow probe never blocks other chats.
    pub async fn run(self: Arc<Self>, channel: Arc<dyn Channel>) -> Result<()> {
        let mut stream = channel.listen().await?;
        tracing::info!("Listening for commands on {}", channel.name());

        while let Some(incoming) = stream.next().await {
            let bot = self.clone();
            let channel = channel.clone();
            tokio::spawn(async move {
                let reply = match bot.handle(&incoming).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::error!("Failed to handle message from {}: {e}", incoming.thread_id);
                        BotReply::Send(OutgoingMessage::text(
                            &incoming.thread_id,
                            "⚠️ Something went wrong, please try again.",
                        ))
                    }
                };
                if let Err(e) = dispatch(channel.as_ref(), reply).await {
                    tracing::warn!("Failed to reply to {}: {e}", incoming.thread_id);
                }
            });
        }

        tracing::info!("Channel {} stream ended", channel.name());
        Ok(())
    }
}

/// Deliver a reply through the channel.
pub async fn dispatch(channel: &dyn Channel, reply: BotReply) -> Result<()> {
    match reply {
        BotReply::Send(message) => channel.send(message).await,
        BotReply::Callback { callback_id, thread_id, message_id, edit } => {
            channel.answer_callback(&callback_id, None).await?;
            match (message_id, edit) {
                (Some(message_id), Some(text)) => channel.edit_message(&thread_id, &message_id, &text).await,
                (None, Some(text)) => channel.send(OutgoingMessage::text(thread_id, text)).await,
                _ => Ok(()),
            }
        }
        BotReply::None => Ok(()),
    }
}
