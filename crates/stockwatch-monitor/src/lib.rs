//! # StockWatch Monitor
//!
//! Owns one independent polling loop per (subscriber, product page) pair.
//!
//! ## Architecture
//! ```text
//! Supervisor
//!   ├── start_watching ─ probe once → store.insert → registry.insert_with
//!   ├── stop_watching  ─ registry.remove → cancel → store.delete
//!   ├── restore_all    ─ store.list_all → registry.insert_with (per row)
//!   └── TaskRegistry (single mutex)
//!         ├── (100, https://shop/a) → PollerHandle { cancel, task }
//!         └── (200, https://shop/a) → PollerHandle { cancel, task }
//!
//! Poller loop: probe → notify while in stock → interruptible sleep
//! ```
//!
//! Alerts are repeated every cycle while a product is in stock. The only way
//! to stop them is to stop watching the pair.

pub mod poller;
pub mod registry;
pub mod supervisor;

#[cfg(test)]
mod testing;

pub use poller::Poller;
pub use registry::{PollerHandle, PollerState, TaskRegistry};
pub use supervisor::{RestoreReport, Supervisor, WatchStarted, validate_resource};
