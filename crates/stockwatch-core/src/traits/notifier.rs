//! Alert delivery trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Notification, SubscriberId};

/// Delivers in-stock alerts to subscribers.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subscriber: SubscriberId, notification: &Notification) -> Result<()>;
}
