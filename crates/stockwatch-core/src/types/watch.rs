//! Tracked pairs, probe results, and alert payloads.

use serde::{Deserialize, Serialize};

use super::NotificationToken;

/// Opaque subscriber identity (a chat id on the messaging side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub i64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubscriberId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A (subscriber, resource) combination. Unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedPair {
    pub subscriber: SubscriberId,
    pub resource: String,
}

impl TrackedPair {
    pub fn new(subscriber: impl Into<SubscriberId>, resource: impl Into<String>) -> Self {
        Self {
            subscriber: subscriber.into(),
            resource: resource.into(),
        }
    }

    /// Silence-callback token for this pair's resource.
    pub fn token(&self) -> NotificationToken {
        NotificationToken::for_resource(&self.resource)
    }
}

impl std::fmt::Display for TrackedPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {}", self.subscriber, self.resource)
    }
}

/// Last observed availability of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Unknown,
    Available,
    Unavailable,
}

impl Availability {
    pub fn from_in_stock(in_stock: bool) -> Self {
        if in_stock {
            Self::Available
        } else {
            Self::Unavailable
        }
    }

    pub fn is_available(self) -> bool {
        self == Self::Available
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::Unknown => write!(f, "unknown"),
            Availability::Available => write!(f, "in stock"),
            Availability::Unavailable => write!(f, "out of stock"),
        }
    }
}

/// Outcome of one successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub display_name: String,
    pub price: String,
    pub in_stock: bool,
}

impl ProbeResult {
    pub fn availability(&self) -> Availability {
        Availability::from_in_stock(self.in_stock)
    }
}

/// One persisted subscription row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber: SubscriberId,
    pub resource: String,
    pub display_name: String,
}

impl Subscription {
    pub fn pair(&self) -> TrackedPair {
        TrackedPair::new(self.subscriber, self.resource.clone())
    }
}

/// In-stock alert handed to a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub display_name: String,
    pub price: String,
    pub link: String,
    /// Correlates the "stop alerts" action back to this resource.
    pub silence_token: NotificationToken,
}

impl Notification {
    pub fn in_stock(pair: &TrackedPair, probe: &ProbeResult) -> Self {
        Self {
            display_name: probe.display_name.clone(),
            price: probe.price.clone(),
            link: pair.resource.clone(),
            silence_token: pair.token(),
        }
    }
}

/// A row of the watch list shown to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedItem {
    pub resource: String,
    pub display_name: String,
    pub price: Option<String>,
    pub status: Availability,
}
