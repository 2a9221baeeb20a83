//! Collaborator traits the monitor and front end are written against.

pub mod channel;
pub mod notifier;
pub mod prober;
pub mod store;

pub use channel::Channel;
pub use notifier::Notifier;
pub use prober::Prober;
pub use store::SubscriptionStore;
