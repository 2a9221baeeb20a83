//! Unified error types for StockWatch.

use thiserror::Error;

/// Result type alias using StockWatchError.
pub type Result<T> = std::result::Result<T, StockWatchError>;

#[derive(Error, Debug)]
pub enum StockWatchError {
    // Probe errors
    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Probe returned HTTP {0}")]
    ProbeStatus(u16),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    // Store errors
    #[error("Subscription store error: {0}")]
    Store(String),

    // Channel errors
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl StockWatchError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for failures of a single probe round trip.
    /// The steady-state poller treats these as "unavailable" for one cycle.
    pub fn is_probe_failure(&self) -> bool {
        matches!(
            self,
            Self::Probe(_) | Self::ProbeStatus(_) | Self::Http(_) | Self::Timeout(_)
        )
    }
}
