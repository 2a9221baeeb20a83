//! The per-pair background polling loop.
//!
//! Each cycle probes the product page and, if it is in stock, sends an
//! alert. Alerts repeat every cycle while the product stays in stock. Probe
//! and delivery failures are logged and never end the loop; only the
//! cancellation token does.

use std::sync::Arc;
use std::time::Duration;

use stockwatch_core::traits::{Notifier, Prober};
use stockwatch_core::types::{Availability, Notification, ProbeResult, TrackedPair};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::PollerHandle;

pub struct Poller {
    pair: TrackedPair,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    cancel: CancellationToken,
    last_seen: watch::Sender<Availability>,
}

impl Poller {
    pub fn new(
        pair: TrackedPair,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self {
        let (last_seen, _) = watch::channel(Availability::Unknown);
        Self {
            pair,
            prober,
            notifier,
            interval,
            cancel: CancellationToken::new(),
            last_seen,
        }
    }

    /// Run the loop on a new tokio task.
    pub fn spawn(self) -> PollerHandle {
        let cancel = self.cancel.clone();
        let last_seen = self.last_seen.subscribe();
        let task = tokio::spawn(self.run());
        PollerHandle::new(cancel, task, last_seen)
    }

    /// Loop until cancelled.
    pub async fn run(self) {
        info!("👀 Watching {}", self.pair);
        let mut cycle: u64 = 0;

        while !self.cancel.is_cancelled() {
            cycle += 1;

            // An in-flight probe is dropped on cancellation, so its result
            // can never turn into an alert.
            let probe = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.prober.probe(&self.pair.resource) => result,
            };

            match probe {
                Ok(result) => {
                    self.last_seen.send_replace(result.availability());
                    if result.in_stock {
                        self.alert(&result, cycle).await;
                    }
                }
                Err(e) => {
                    debug!("Probe failed for {} (cycle {cycle}): {e}", self.pair);
                    self.last_seen.send_replace(Availability::Unavailable);
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Stopped watching {} after {cycle} cycles", self.pair);
    }

    async fn alert(&self, result: &ProbeResult, cycle: u64) {
        let notification = Notification::in_stock(&self.pair, result);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            sent = self.notifier.notify(self.pair.subscriber, &notification) => match sent {
                Ok(()) => debug!("Alert sent for {} (cycle {cycle})", self.pair),
                Err(e) => warn!("Could not alert subscriber {}: {e}", self.pair.subscriber),
            }
        }
    }
}
