//! # StockWatch Core
//! Shared error type, data types, collaborator traits, and configuration.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::StockWatchConfig;
pub use error::{Result, StockWatchError};
