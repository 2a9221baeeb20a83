//! Chat message types exchanged with channels.

use serde::{Deserialize, Serialize};

/// Incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub channel: String,
    pub thread_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub content: String,
    pub thread_type: ThreadType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub reply_to: Option<String>,
    /// Present when the message is a button press rather than typed text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<CallbackInfo>,
}

impl IncomingMessage {
    /// Plain text message in a direct thread.
    pub fn text(
        channel: impl Into<String>,
        thread_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let thread_id = thread_id.into();
        Self {
            channel: channel.into(),
            sender_id: thread_id.clone(),
            thread_id,
            sender_name: None,
            content: content.into(),
            thread_type: ThreadType::Direct,
            timestamp: chrono::Utc::now(),
            reply_to: None,
            callback: None,
        }
    }

    /// Button press carrying callback data.
    pub fn callback(
        channel: impl Into<String>,
        thread_id: impl Into<String>,
        callback: CallbackInfo,
    ) -> Self {
        let mut msg = Self::text(channel, thread_id, "");
        msg.callback = Some(callback);
        msg
    }
}

/// Inline-button press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackInfo {
    /// Id used to acknowledge the press.
    pub id: String,
    /// Message the pressed button belongs to.
    pub message_id: Option<String>,
    pub data: String,
}

/// Outgoing message to a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub thread_id: String,
    pub content: String,
    pub thread_type: ThreadType,
    pub reply_to: Option<String>,
    /// Inline keyboard, one inner vec per row.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Vec<Button>>,
    #[serde(default)]
    pub disable_preview: bool,
}

impl OutgoingMessage {
    pub fn text(thread_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            content: content.into(),
            thread_type: ThreadType::Direct,
            reply_to: None,
            buttons: vec![],
            disable_preview: false,
        }
    }

    pub fn with_button_row(mut self, row: Vec<Button>) -> Self {
        self.buttons.push(row);
        self
    }

    pub fn without_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }
}

/// Inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "value")]
pub enum ButtonAction {
    /// Opens a link.
    Url(String),
    /// Sends callback data back to the bot.
    Callback(String),
}

impl Button {
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }
}

/// Thread type for channel messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThreadType {
    Direct,
    Group,
}
