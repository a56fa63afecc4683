//! Synchronous live-update state machine.

use std::sync::Arc;

use corruption_watch_analytics::{AggregateOptions, aggregate_with};
use corruption_watch_analytics_models::{AggregateReport, MetricsSnapshot};
use corruption_watch_case_models::CaseRecord;
use corruption_watch_store::{ChangeEvent, ChannelMessage, ChannelStatus};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{CaseSet, Clock};

/// Whether the reducer is attached to a working event source.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    /// No event source, or the source failed, timed out, or was closed.
    #[default]
    Disconnected,
    /// Receiving events.
    Connected,
}

/// Folds change events into an [`AggregateReport`].
///
/// Holds every known record keyed by id and re-runs aggregation over the
/// whole set after each applied batch. The reference instant is read from
/// the clock once per pass. After any sequence of events the report equals
/// aggregating [`crate::materialize`] of the same sequence over the
/// initial records.
pub struct LiveUpdateReducer {
    cases: CaseSet,
    options: AggregateOptions,
    clock: Arc<dyn Clock>,
    report: AggregateReport,
    state: ConnectionState,
    error: Option<String>,
    update_count: u64,
    last_update: Option<CaseRecord>,
}

impl LiveUpdateReducer {
    /// Creates a disconnected reducer over `initial` records and computes
    /// its first report.
    #[must_use]
    pub fn new(initial: Vec<CaseRecord>, clock: Arc<dyn Clock>, options: AggregateOptions) -> Self {
        let cases: CaseSet = initial.into_iter().collect();
        let report = aggregate_with(&cases.to_vec(), clock.now(), &options);
        Self {
            cases,
            options,
            clock,
            report,
            state: ConnectionState::Disconnected,
            error: None,
            update_count: 0,
            last_update: None,
        }
    }

    /// Applies one event and recomputes.
    pub fn apply(&mut self, event: &ChangeEvent) {
        self.record(event);
        self.recompute();
    }

    /// Applies `events` in order, recomputing once at the end.
    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a ChangeEvent>) {
        let mut applied = false;
        for event in events {
            self.record(event);
            applied = true;
        }
        if applied {
            self.recompute();
        }
    }

    /// Applies a batch of channel messages in order. Status transitions
    /// take effect as they are met; the report is recomputed once if any
    /// change was among them.
    pub fn apply_messages(&mut self, messages: impl IntoIterator<Item = ChannelMessage>) {
        let mut changed = false;
        for message in messages {
            match message {
                ChannelMessage::Change(event) => {
                    self.record(&event);
                    changed = true;
                }
                ChannelMessage::Status { status, reason } => self.apply_status(status, reason),
            }
        }
        if changed {
            self.recompute();
        }
    }

    /// Applies a connection-status transition.
    pub fn apply_status(&mut self, status: ChannelStatus, reason: Option<String>) {
        match status {
            ChannelStatus::Subscribed => {
                if self.state != ConnectionState::Connected {
                    log::info!("Live updates connected");
                }
                self.state = ConnectionState::Connected;
                self.error = None;
            }
            ChannelStatus::Error | ChannelStatus::TimedOut => {
                let reason = reason
                    .or_else(|| status.default_reason().map(str::to_string))
                    .unwrap_or_else(|| status.to_string());
                log::warn!("Live updates disconnected: {reason}");
                self.state = ConnectionState::Disconnected;
                self.error = Some(reason);
            }
            ChannelStatus::Closed => self.disconnect(),
        }
    }

    /// Marks the reducer as failed to attach, keeping `reason`.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Live updates unavailable: {reason}");
        self.state = ConnectionState::Disconnected;
        self.error = Some(reason);
    }

    /// Marks the reducer as cleanly detached.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Connected {
            log::info!("Live updates closed");
        }
        self.state = ConnectionState::Disconnected;
    }

    fn record(&mut self, event: &ChangeEvent) {
        if !self.cases.apply(event) {
            log::debug!(
                "{} event for '{}' left the case set unchanged",
                event.kind,
                event.record.id
            );
        }
        self.update_count += 1;
        self.last_update = Some(event.record.clone());
        log::debug!("Applied {} event #{}", event.kind, self.update_count);
    }

    fn recompute(&mut self) {
        let now = self.clock.now();
        self.report = aggregate_with(&self.cases.to_vec(), now, &self.options);
    }

    /// Current summary metrics.
    #[must_use]
    pub const fn snapshot(&self) -> &MetricsSnapshot {
        &self.report.snapshot
    }

    /// Current full report.
    #[must_use]
    pub const fn report(&self) -> &AggregateReport {
        &self.report
    }

    /// Records currently known.
    #[must_use]
    pub const fn cases(&self) -> &CaseSet {
        &self.cases
    }

    /// Events processed so far.
    #[must_use]
    pub const fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Record carried by the most recent event.
    #[must_use]
    pub const fn last_update(&self) -> Option<&CaseRecord> {
        self.last_update.as_ref()
    }

    /// Connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` while connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Reason for the last failure, cleared on reconnect.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl std::fmt::Debug for LiveUpdateReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveUpdateReducer")
            .field("cases", &self.cases.len())
            .field("state", &self.state)
            .field("update_count", &self.update_count)
            .finish_non_exhaustive()
    }
}
