//! Shared data types.

pub mod message;
pub mod token;
pub mod watch;

pub use message::{Button, ButtonAction, CallbackInfo, IncomingMessage, OutgoingMessage, ThreadType};
pub use token::NotificationToken;
pub use watch::{
    Availability, Notification, ProbeResult, SubscriberId, Subscription, TrackedPair, WatchedItem,
};
