//! Supervisor: starts, restores, and stops pollers against the registry
//! and the subscription store.

use std::sync::Arc;

use futures::future::join_all;
use stockwatch_core::config::MonitorConfig;
use stockwatch_core::error::{Result, StockWatchError};
use stockwatch_core::traits::{Notifier, Prober, SubscriptionStore};
use stockwatch_core::types::{
    Availability, NotificationToken, ProbeResult, SubscriberId, TrackedPair, WatchedItem,
};
use tracing::{debug, info, warn};

use crate::poller::Poller;
use crate::registry::TaskRegistry;

/// Outcome of [`Supervisor::start_watching`].
#[derive(Debug, Clone)]
pub struct WatchStarted {
    /// Probe taken before subscribing, for immediate feedback.
    pub probe: ProbeResult,
    /// False when a poller was already running for the pair.
    pub started: bool,
}

/// Outcome of [`Supervisor::restore_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub already_active: usize,
    /// Rows whose resource is not a usable URL.
    pub skipped: usize,
}

pub struct Supervisor {
    registry: TaskRegistry,
    /// Held across each store write and its registry change, so the store
    /// always covers every registered pair.
    writes: tokio::sync::Mutex<()>,
    store: Arc<dyn SubscriptionStore>,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
}

impl Supervisor {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            registry: TaskRegistry::new(),
            writes: tokio::sync::Mutex::new(()),
            store,
            prober,
            notifier,
            config,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn prober(&self) -> &Arc<dyn Prober> {
        &self.prober
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_watching(&self, subscriber: SubscriberId, resource: &str) -> bool {
        self.registry.is_active(&TrackedPair::new(subscriber, resource))
    }

    /// Probe once, persist the pair, and make sure one poller runs for it.
    ///
    /// Unlike the poller loop, a probe failure here is returned to the
    /// caller and nothing is persisted.
    pub async fn start_watching(&self, subscriber: SubscriberId, resource: &str) -> Result<WatchStarted> {
        let resource = validate_resource(resource)?;
        let probe = self.prober.probe(&resource).await?;

        let pair = TrackedPair::new(subscriber, resource);
        let started = {
            let _writes = self.writes.lock().await;
            self.store.insert(subscriber, &pair.resource, &probe.display_name).await?;
            self.ensure_poller(&pair)
        };
        if started {
            info!("Subscribed {pair} ({})", probe.display_name);
        } else {
            debug!("Already watching {pair}");
        }
        Ok(WatchStarted { probe, started })
    }

    /// Cancel the pair's poller, if any, and delete the persisted row.
    /// Returns whether a poller was running.
    pub async fn stop_watching(&self, subscriber: SubscriberId, resource: &str) -> Result<bool> {
        let pair = TrackedPair::new(subscriber, resource.trim());
        let _writes = self.writes.lock().await;
        let was_active = match self.registry.remove(&pair) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        };

        self.store.delete(subscriber, &pair.resource).await?;
        info!("Unsubscribed {pair} (poller was {})", if was_active { "running" } else { "idle" });
        Ok(was_active)
    }

    /// Stop the subscriber's pair whose resource fingerprint equals `token`.
    /// Returns the resource that was stopped; unknown tokens are ignored.
    pub async fn stop_watching_by_token(
        &self,
        subscriber: SubscriberId,
        token: &NotificationToken,
    ) -> Result<Option<String>> {
        let matched = self
            .registry
            .pairs_for(subscriber)
            .into_iter()
            .find(|pair| token.matches(&pair.resource));

        let Some(pair) = matched else {
            debug!("No active pair for subscriber {subscriber} matches token {token}");
            return Ok(None);
        };

        self.stop_watching(subscriber, &pair.resource).await?;
        Ok(Some(pair.resource))
    }

    /// Wait the configured settling delay, then [`Self::restore_all`].
    pub async fn restore_after_settle(&self) -> Result<RestoreReport> {
        tokio::time::sleep(self.config.restore_delay()).await;
        self.restore_all().await
    }

    /// Ensure a poller for every persisted pair. Safe to call repeatedly;
    /// each row is handled on its own.
    pub async fn restore_all(&self) -> Result<RestoreReport> {
        let _writes = self.writes.lock().await;
        let rows = self.store.list_all().await?;
        let mut report = RestoreReport::default();

        for row in rows {
            let resource = match validate_resource(&row.resource) {
                Ok(resource) => resource,
                Err(e) => {
                    warn!("Skipping stored subscription of {}: {e}", row.subscriber);
                    report.skipped += 1;
                    continue;
                }
            };
            if self.ensure_poller(&TrackedPair::new(row.subscriber, resource)) {
                report.restored += 1;
            } else {
                report.already_active += 1;
            }
        }

        info!(
            "♻️  Restored {} pollers ({} already active, {} skipped)",
            report.restored, report.already_active, report.skipped
        );
        Ok(report)
    }

    /// Fresh status of every persisted pair of one subscriber. Read only:
    /// failed probes show as [`Availability::Unknown`].
    pub async fn list_watched(&self, subscriber: SubscriberId) -> Result<Vec<WatchedItem>> {
        let rows = self.store.list_by_subscriber(subscriber).await?;

        let items = rows.into_iter().map(|(resource, display_name)| async move {
            match self.prober.probe(&resource).await {
                Ok(probe) => WatchedItem {
                    status: probe.availability(),
                    price: Some(probe.price),
                    resource,
                    display_name,
                },
                Err(e) => {
                    debug!("List probe failed for {resource}: {e}");
                    WatchedItem {
                        resource,
                        display_name,
                        price: None,
                        status: Availability::Unknown,
                    }
                }
            }
        });
        Ok(join_all(items).await)
    }

    /// Cancel every poller and wait for them to exit. Persisted rows stay,
    /// so the next start restores them.
    pub async fn shutdown(&self) -> usize {
        let handles = self.registry.drain();
        let count = handles.len();
        join_all(handles.into_iter().map(|(_, handle)| handle.stop())).await;
        info!("Stopped {count} pollers");
        count
    }

    fn ensure_poller(&self, pair: &TrackedPair) -> bool {
        self.registry.insert_with(pair, || {
            Poller::new(
                pair.clone(),
                self.prober.clone(),
                self.notifier.clone(),
                self.config.check_interval(),
            )
            .spawn()
        })
    }
}

/// Accept absolute http(s) URLs only. Returns the trimmed input unchanged,
/// since it is the persisted key.
pub fn validate_resource(resource: &str) -> Result<String> {
    let trimmed = resource.trim();
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| StockWatchError::InvalidResource(format!("{trimmed}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(StockWatchError::InvalidResource(format!(
            "{trimmed}: only http(s) links are supported"
        )));
    }
    Ok(trimmed.to_string())
}
