//! In-memory collaborators for monitor tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use stockwatch_core::error::{Result, StockWatchError};
use stockwatch_core::traits::{Notifier, Prober, SubscriptionStore};
use stockwatch_core::types::{Notification, ProbeResult, SubscriberId, Subscription};
use tokio::sync::Notify;

/// One scripted probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    In,
    Out,
    Fail,
}

impl Step {
    fn outcome(self) -> Result<ProbeResult> {
        match self {
            Step::In | Step::Out => Ok(ProbeResult {
                display_name: "Item".into(),
                price: "10".into(),
                in_stock: self == Step::In,
            }),
            Step::Fail => Err(StockWatchError::ProbeStatus(500)),
        }
    }
}

/// Replays a per-resource script, then repeats the fallback step.
pub struct ScriptedProber {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<HashMap<String, usize>>,
    fallback: Step,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            fallback: Step::Out,
        }
    }

    pub fn script(self, resource: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(resource.to_string(), steps.into_iter().collect());
        self
    }

    pub fn fallback(mut self, step: Step) -> Self {
        self.fallback = step;
        self
    }

    pub fn calls(&self, resource: &str) -> usize {
        self.calls.lock().unwrap().get(resource).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, resource: &str) -> Result<ProbeResult> {
        *self.calls.lock().unwrap().entry(resource.to_string()).or_default() += 1;
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(resource)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.fallback);
        step.outcome()
    }
}

/// First probe answers immediately; every later probe waits for `release`
/// and then reports in stock.
pub struct GatedProber {
    gate: Notify,
    started: AtomicUsize,
}

impl GatedProber {
    pub fn new() -> Self {
        Self { gate: Notify::new(), started: AtomicUsize::new(0) }
    }

    pub fn release(&self) {
        self.gate.notify_waiters();
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for GatedProber {
    async fn probe(&self, _resource: &str) -> Result<ProbeResult> {
        if self.started.fetch_add(1, Ordering::SeqCst) > 0 {
            self.gate.notified().await;
        }
        Step::In.outcome()
    }
}

/// Records every alert; optionally fails every delivery.
pub struct RecordingNotifier {
    sent: Mutex<Vec<(SubscriberId, Notification)>>,
    attempts: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let notifier = Self::new();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn sent(&self) -> Vec<(SubscriberId, Notification)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_to(&self, subscriber: SubscriberId) -> usize {
        self.sent.lock().unwrap().iter().filter(|(s, _)| *s == subscriber).count()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subscriber: SubscriberId, notification: &Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StockWatchError::delivery("chat not found"));
        }
        self.sent.lock().unwrap().push((subscriber, notification.clone()));
        Ok(())
    }
}

/// `INSERT OR IGNORE` semantics over a sorted map.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<(SubscriberId, String), String>>,
}

impl MemoryStore {
    pub fn with_rows(rows: &[(i64, &str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut map = store.rows.lock().unwrap();
            for (subscriber, resource, name) in rows {
                map.insert((SubscriberId(*subscriber), resource.to_string()), name.to_string());
            }
        }
        store
    }

    pub fn contains(&self, subscriber: i64, resource: &str) -> bool {
        self.rows
            .lock()
            .unwrap()
            .contains_key(&(SubscriberId(subscriber), resource.to_string()))
    }

    pub fn name_of(&self, subscriber: i64, resource: &str) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .get(&(SubscriberId(subscriber), resource.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, subscriber: SubscriberId, resource: &str, display_name: &str) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .entry((subscriber, resource.to_string()))
            .or_insert_with(|| display_name.to_string());
        Ok(())
    }

    async fn delete(&self, subscriber: SubscriberId, resource: &str) -> Result<()> {
        self.rows.lock().unwrap().remove(&(subscriber, resource.to_string()));
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Subscription>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|((subscriber, resource), name)| Subscription {
                subscriber: *subscriber,
                resource: resource.clone(),
                display_name: name.clone(),
            })
            .collect())
    }

    async fn list_by_subscriber(&self, subscriber: SubscriberId) -> Result<Vec<(String, String)>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((s, _), _)| *s == subscriber)
            .map(|((_, resource), name)| (resource.clone(), name.clone()))
            .collect())
    }
}

/// [`MemoryStore`] whose `delete` waits for `release` before removing.
#[derive(Default)]
pub struct GatedStore {
    pub inner: MemoryStore,
    gate: Notify,
    deleting: AtomicBool,
}

impl GatedStore {
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// True once a `delete` call is waiting on the gate.
    pub fn deleting(&self) -> bool {
        self.deleting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionStore for GatedStore {
    fn name(&self) -> &str {
        "gated"
    }

    async fn insert(&self, subscriber: SubscriberId, resource: &str, display_name: &str) -> Result<()> {
        self.inner.insert(subscriber, resource, display_name).await
    }

    async fn delete(&self, subscriber: SubscriberId, resource: &str) -> Result<()> {
        self.deleting.store(true, Ordering::SeqCst);
        self.gate.notified().await;
        self.inner.delete(subscriber, resource).await
    }

    async fn list_all(&self) -> Result<Vec<Subscription>> {
        self.inner.list_all().await
    }

    async fn list_by_subscriber(&self, subscriber: SubscriberId) -> Result<Vec<(String, String)>> {
        self.inner.list_by_subscriber(subscriber).await
    }
}
