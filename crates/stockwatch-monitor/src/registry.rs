//! Task registry: the in-memory map of pairs that are actively polled.
//!
//! All lookups and mutations go through one mutex, so "is a live poller
//! registered?" and "register a poller" happen atomically. At most one live
//! poller exists per pair.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use stockwatch_core::types::{Availability, SubscriberId, TrackedPair};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Running,
    /// Terminal: cancelled or the task exited.
    Stopped,
}

/// Running poller, owned by its registry entry.
#[derive(Debug)]
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    last_seen: watch::Receiver<Availability>,
}

impl PollerHandle {
    pub fn new(
        cancel: CancellationToken,
        task: JoinHandle<()>,
        last_seen: watch::Receiver<Availability>,
    ) -> Self {
        Self { cancel, task, last_seen }
    }

    /// Signal the poller to stop. Returns immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn state(&self) -> PollerState {
        if self.cancel.is_cancelled() || self.task.is_finished() {
            PollerState::Stopped
        } else {
            PollerState::Running
        }
    }

    /// Availability seen by the most recent cycle.
    pub fn last_seen(&self) -> Availability {
        *self.last_seen.borrow()
    }

    /// Cancel and wait for the task to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::warn!("Poller task panicked: {e}");
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TaskRegistry {
    entries: Mutex<HashMap<TrackedPair, PollerHandle>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-written,
    // so a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<TrackedPair, PollerHandle>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True if a live (not finished) poller is registered for the pair.
    pub fn is_active(&self, pair: &TrackedPair) -> bool {
        self.lock().get(pair).is_some_and(|h| !h.is_finished())
    }

    pub fn state(&self, pair: &TrackedPair) -> Option<PollerState> {
        self.lock().get(pair).map(PollerHandle::state)
    }

    pub fn last_seen(&self, pair: &TrackedPair) -> Option<Availability> {
        self.lock().get(pair).map(PollerHandle::last_seen)
    }

    /// Register the handle produced by `spawn` unless a live poller already
    /// exists for the pair. `spawn` runs under the lock and only when needed.
    /// Returns whether a new poller was registered.
    pub fn insert_with<F>(&self, pair: &TrackedPair, spawn: F) -> bool
    where
        F: FnOnce() -> PollerHandle,
    {
        let mut entries = self.lock();
        if entries.get(pair).is_some_and(|h| !h.is_finished()) {
            return false;
        }
        if entries.insert(pair.clone(), spawn()).is_some() {
            tracing::debug!("Replaced finished poller for {pair}");
        }
        true
    }

    /// Take the entry out of the registry. The caller decides whether to
    /// cancel it.
    pub fn remove(&self, pair: &TrackedPair) -> Option<PollerHandle> {
        self.lock().remove(pair)
    }

    /// Registered pairs of one subscriber.
    pub fn pairs_for(&self, subscriber: SubscriberId) -> Vec<TrackedPair> {
        let mut pairs: Vec<TrackedPair> = self
            .lock()
            .keys()
            .filter(|p| p.subscriber == subscriber)
            .cloned()
            .collect();
        pairs.sort_by(|a, b| a.resource.cmp(&b.resource));
        pairs
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Empty the registry, handing every entry to the caller.
    pub fn drain(&self) -> Vec<(TrackedPair, PollerHandle)> {
        self.lock().drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_handle() -> PollerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { token.cancelled().await });
        let (_tx, rx) = watch::channel(Availability::Unknown);
        PollerHandle::new(cancel, task, rx)
    }

    fn finished_handle() -> PollerHandle {
        let task = tokio::spawn(async {});
        let (_tx, rx) = watch::channel(Availability::Unknown);
        PollerHandle::new(CancellationToken::new(), task, rx)
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_for_live_handle() {
        let registry = TaskRegistry::new();
        let pair = TrackedPair::new(1, "http://x/a");

        assert!(registry.insert_with(&pair, idle_handle));
        let mut spawned_again = false;
        let inserted = registry.insert_with(&pair, || {
            spawned_again = true;
            idle_handle()
        });
        assert!(!inserted);
        assert!(!spawned_again);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_active(&pair));
        assert_eq!(registry.state(&pair), Some(PollerState::Running));
    }

    #[tokio::test]
    async fn test_finished_handle_is_replaced() {
        let registry = TaskRegistry::new();
        let pair = TrackedPair::new(1, "http://x/a");
        registry.insert_with(&pair, finished_handle);

        while registry.is_active(&pair) {
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.state(&pair), Some(PollerState::Stopped));
        assert!(registry.insert_with(&pair, idle_handle));
        assert!(registry.is_active(&pair));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_cancel() {
        let registry = TaskRegistry::new();
        let pair = TrackedPair::new(1, "http://x/a");
        registry.insert_with(&pair, idle_handle);

        let handle = registry.remove(&pair).unwrap();
        assert!(registry.is_empty());
        assert!(registry.remove(&pair).is_none());
        handle.cancel();
        assert_eq!(handle.state(), PollerState::Stopped);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_pairs_for_filters_by_subscriber() {
        let registry = TaskRegistry::new();
        registry.insert_with(&TrackedPair::new(1, "http://x/b"), idle_handle);
        registry.insert_with(&TrackedPair::new(1, "http://x/a"), idle_handle);
        registry.insert_with(&TrackedPair::new(2, "http://x/a"), idle_handle);

        let pairs = registry.pairs_for(SubscriberId(1));
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].resource, "http://x/a");
        assert!(registry.pairs_for(SubscriberId(3)).is_empty());

        let drained = registry.drain();
        assert_eq!(drained.len(), 3);
        assert!(registry.is_empty());
        for (_, handle) in drained {
            handle.stop().await;
        }
    }
}
