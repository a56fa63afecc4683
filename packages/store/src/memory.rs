//! In-process case store.
//!
//! Holds the collection in memory and publishes every mutation to its live
//! subscribers, in mutation order. Useful for tests, demos, and replaying
//! recorded change logs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use corruption_watch_case_models::CaseRecord;
use tokio::sync::mpsc;

use crate::{
    CaseStore, ChangeEvent, ChangeKind, ChannelMessage, ChannelStatus, StoreError, Subscription,
};

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<ChannelMessage>,
}

#[derive(Default)]
struct Inner {
    cases: Vec<CaseRecord>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    fetch_failure: Option<String>,
    subscribe_failure: Option<String>,
}

impl Inner {
    fn publish(&mut self, message: &ChannelMessage) {
        self.subscribers
            .retain(|sub| sub.tx.send(message.clone()).is_ok());
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.cases.iter().position(|case| case.id == id)
    }
}

/// In-memory [`CaseStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `cases`. No events are published for
    /// the seed.
    #[must_use]
    pub fn with_cases(cases: Vec<CaseRecord>) -> Self {
        let store = Self::new();
        store.lock().cases = cases;
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `record`, replacing any record with the same id in place, and
    /// publishes an insert event.
    pub fn insert(&self, record: CaseRecord) {
        let mut inner = self.lock();
        match inner.position(&record.id) {
            Some(idx) => inner.cases[idx] = record.clone(),
            None => inner.cases.push(record.clone()),
        }
        inner.publish(&ChannelMessage::Change(ChangeEvent::insert(record)));
    }

    /// Replaces the record with the same id (adding it if absent) and
    /// publishes an update event.
    pub fn update(&self, record: CaseRecord) {
        let mut inner = self.lock();
        match inner.position(&record.id) {
            Some(idx) => inner.cases[idx] = record.clone(),
            None => inner.cases.push(record.clone()),
        }
        inner.publish(&ChannelMessage::Change(ChangeEvent::update(record)));
    }

    /// Removes the record with `id` and publishes a delete event carrying
    /// the old row. Returns the removed row, or `None` (and publishes
    /// nothing) if there was none.
    pub fn delete(&self, id: &str) -> Option<CaseRecord> {
        let mut inner = self.lock();
        let idx = inner.position(id)?;
        let old = inner.cases.remove(idx);
        inner.publish(&ChannelMessage::Change(ChangeEvent::delete(old.clone())));
        Some(old)
    }

    /// Applies `event` to the collection and publishes it unchanged, even
    /// when it leaves the collection as it was (a delete of an unknown id).
    pub fn apply(&self, event: ChangeEvent) {
        let mut inner = self.lock();
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => match inner.position(&event.record.id) {
                Some(idx) => inner.cases[idx] = event.record.clone(),
                None => inner.cases.push(event.record.clone()),
            },
            ChangeKind::Delete => {
                if let Some(idx) = inner.position(&event.record.id) {
                    inner.cases.remove(idx);
                }
            }
        }
        inner.publish(&ChannelMessage::Change(event));
    }

    /// Publishes a connection-status transition to every subscriber.
    pub fn broadcast_status(&self, status: ChannelStatus, reason: Option<String>) {
        self.lock().publish(&ChannelMessage::Status { status, reason });
    }

    /// Makes subsequent [`CaseStore::fetch_all`] calls fail with `message`,
    /// or succeed again with `None`.
    pub fn fail_fetches(&self, message: Option<String>) {
        self.lock().fetch_failure = message;
    }

    /// Makes subsequent [`CaseStore::subscribe`] calls fail with `reason`,
    /// or succeed again with `None`.
    pub fn fail_subscriptions(&self, reason: Option<String>) {
        self.lock().subscribe_failure = reason;
    }

    /// Number of live subscribers still attached.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|sub| !sub.tx.is_closed());
        inner.subscribers.len()
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().cases.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn detach(inner: &Weak<Mutex<Inner>>, id: u64) {
    if let Some(inner) = inner.upgrade() {
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.subscribers.retain(|sub| sub.id != id);
        log::debug!("Detached memory store subscriber {id}");
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_all(&self) -> Result<Vec<CaseRecord>, StoreError> {
        let inner = self.lock();
        if let Some(message) = &inner.fetch_failure {
            return Err(StoreError::Config {
                message: message.clone(),
            });
        }
        Ok(inner.cases.clone())
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let mut inner = self.lock();
        if let Some(reason) = &inner.subscribe_failure {
            return Err(StoreError::Subscription {
                reason: reason.clone(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;

        let _ = tx.send(ChannelMessage::Status {
            status: ChannelStatus::Subscribed,
            reason: None,
        });
        inner.subscribers.push(Subscriber { id, tx });
        drop(inner);

        log::debug!("Attached memory store subscriber {id}");
        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || detach(&weak, id)))
    }
}
