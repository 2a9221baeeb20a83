//! Durable subscription storage trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{SubscriberId, Subscription};

/// Durable `(subscriber, resource) → display name` relation.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert a row. An existing row for the pair is left untouched.
    async fn insert(&self, subscriber: SubscriberId, resource: &str, display_name: &str) -> Result<()>;

    /// Delete a row. Deleting a missing row is not an error.
    async fn delete(&self, subscriber: SubscriberId, resource: &str) -> Result<()>;

    async fn list_all(&self) -> Result<Vec<Subscription>>;

    /// `(resource, display_name)` rows for one subscriber.
    async fn list_by_subscriber(&self, subscriber: SubscriberId) -> Result<Vec<(String, String)>>;
}
