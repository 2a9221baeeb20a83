//! # StockWatch Channels
//! Messaging transports. Telegram is both the command channel and the
//! alert notifier.

pub mod telegram;

pub use telegram::TelegramChannel;
