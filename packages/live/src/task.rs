//! Background task driving a [`LiveUpdateReducer`] from a subscription.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use corruption_watch_analytics::AggregateOptions;
use corruption_watch_analytics_models::{AggregateReport, MetricsSnapshot};
use corruption_watch_case_models::CaseRecord;
use corruption_watch_store::{CaseStore, ChannelMessage, ChannelStatus, Subscription};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::{Clock, ConnectionState, LiveError, LiveUpdateReducer};

type Shared = Arc<Mutex<LiveUpdateReducer>>;

fn lock(shared: &Shared) -> MutexGuard<'_, LiveUpdateReducer> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Subscribes to changes in `store`, reads its initial records, and starts
/// a reducer over both.
///
/// The subscription is opened before the read so that no write can fall
/// between the two. Writes that land in both are applied twice, which
/// leaves the same case set since insert and update upsert and deleting a
/// missing id is a no-op.
///
/// A subscription failure is not fatal: the handle comes back
/// disconnected, carrying the failure reason, and keeps serving the
/// initial snapshot.
///
/// # Errors
///
/// Returns [`LiveError::Store`] if the initial read fails.
pub async fn connect(
    store: &dyn CaseStore,
    clock: Arc<dyn Clock>,
    options: AggregateOptions,
) -> Result<LiveHandle, LiveError> {
    let subscription = store.subscribe().await;
    let initial = store.fetch_all().await?;
    log::info!(
        "Loaded {} case record(s) from the {} store",
        initial.len(),
        store.name()
    );
    let mut reducer = LiveUpdateReducer::new(initial, clock, options);

    match subscription {
        Ok(subscription) => Ok(spawn_reducer(reducer, subscription)),
        Err(e) => {
            reducer.fail(e.to_string());
            Ok(LiveHandle::detached(reducer))
        }
    }
}

/// Runs `reducer` on a background task fed by `subscription`.
///
/// Messages are applied in the order received. Whatever is already queued
/// when the task wakes is applied as one batch before recomputing. The
/// subscription is released when the handle is closed or dropped, when
/// the channel reports [`ChannelStatus::Closed`], or when the store side
/// goes away. Messages queued behind a `Closed` status are discarded.
#[must_use]
pub fn spawn_reducer(mut reducer: LiveUpdateReducer, subscription: Subscription) -> LiveHandle {
    reducer.apply_status(ChannelStatus::Subscribed, None);

    let shared = Arc::new(Mutex::new(reducer));
    let (revision_tx, revision_rx) = watch::channel(0_u64);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(run(
        Arc::clone(&shared),
        subscription,
        shutdown_rx,
        revision_tx,
    ));

    LiveHandle {
        shared,
        revision: revision_rx,
        shutdown: Some(shutdown_tx),
        task: Some(task),
    }
}

const fn is_close(message: &ChannelMessage) -> bool {
    matches!(
        message,
        ChannelMessage::Status {
            status: ChannelStatus::Closed,
            ..
        }
    )
}

async fn run(
    shared: Shared,
    mut subscription: Subscription,
    mut shutdown: oneshot::Receiver<()>,
    revision: watch::Sender<u64>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                log::debug!("Live reducer shutdown requested");
                break;
            }
            message = subscription.next() => {
                let Some(first) = message else {
                    log::info!("Live update channel ended");
                    lock(&shared).disconnect();
                    revision.send_modify(|n| *n += 1);
                    break;
                };

                let mut closed = is_close(&first);
                let mut batch = vec![first];
                while !closed && let Some(next) = subscription.try_next() {
                    closed = is_close(&next);
                    batch.push(next);
                }
                log::debug!("Applying {} live message(s)", batch.len());

                lock(&shared).apply_messages(batch);
                revision.send_modify(|n| *n += 1);

                if closed {
                    log::info!("Live update channel closed by the store");
                    break;
                }
            }
        }
    }

    subscription.close();
}

/// Read access to a running reducer, and the means to stop it.
///
/// Dropping the handle without [`close`](Self::close) also stops the task
/// and releases the subscription.
pub struct LiveHandle {
    shared: Shared,
    revision: watch::Receiver<u64>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl LiveHandle {
    fn detached(reducer: LiveUpdateReducer) -> Self {
        let (_, revision) = watch::channel(0);
        Self {
            shared: Arc::new(Mutex::new(reducer)),
            revision,
            shutdown: None,
            task: None,
        }
    }

    /// Current summary metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        lock(&self.shared).snapshot().clone()
    }

    /// Current full report.
    #[must_use]
    pub fn report(&self) -> AggregateReport {
        lock(&self.shared).report().clone()
    }

    /// Returns `true` while the subscription is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        lock(&self.shared).is_connected()
    }

    /// Connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        lock(&self.shared).state()
    }

    /// Reason for the last connection failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        lock(&self.shared).error().map(str::to_string)
    }

    /// Events processed so far.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        lock(&self.shared).update_count()
    }

    /// Record carried by the most recent event.
    #[must_use]
    pub fn last_update(&self) -> Option<CaseRecord> {
        lock(&self.shared).last_update().cloned()
    }

    /// Waits until `done` holds for the reducer state.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::Closed`] if the reducer stops before `done`
    /// holds.
    pub async fn wait_until(
        &mut self,
        mut done: impl FnMut(&LiveUpdateReducer) -> bool,
    ) -> Result<(), LiveError> {
        loop {
            let satisfied = done(&*lock(&self.shared));
            if satisfied {
                return Ok(());
            }
            self.revision
                .changed()
                .await
                .map_err(|_| LiveError::Closed)?;
        }
    }

    /// Stops processing events, releases the subscription, and leaves the
    /// reducer disconnected. Reads keep returning the last state. Calling
    /// it again does nothing.
    pub async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            log::error!("Live reducer task failed: {e}");
        }
        lock(&self.shared).disconnect();
    }
}

impl std::fmt::Debug for LiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHandle")
            .field("running", &self.task.is_some())
            .finish_non_exhaustive()
    }
}
