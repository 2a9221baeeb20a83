//! # StockWatch Store
//! Durable subscription rows. Poller run-state is never stored here; it is
//! rebuilt from these rows at startup.

pub mod sqlite;

pub use sqlite::SqliteStore;
