//! Messaging channel trait.

use async_trait::async_trait;
use futures::stream::Stream;

use crate::error::Result;
use crate::types::{IncomingMessage, OutgoingMessage};

/// A chat transport the bot listens on and replies through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn send(&self, message: OutgoingMessage) -> Result<()>;

    /// Stream of incoming messages and button presses.
    async fn listen(&self) -> Result<Box<dyn Stream<Item = IncomingMessage> + Send + Unpin>>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> Result<()> {
        Ok(())
    }

    /// Replace the text of an earlier message. Channels without editing
    /// support post a new message instead.
    async fn edit_message(&self, thread_id: &str, _message_id: &str, content: &str) -> Result<()> {
        self.send(OutgoingMessage::text(thread_id, content)).await
    }
}
