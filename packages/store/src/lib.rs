#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Case record store interface.
//!
//! A [`CaseStore`] offers two things: a bulk read of every case record
//! and a live [`Subscription`] to insert/update/delete events on the case
//! collection. The store handle is built once by the binary and passed to
//! whoever needs it; there is no process-wide client.
//!
//! Backends:
//!
//! * [`memory::MemoryStore`]: in-process collection that publishes its
//!   own mutations to subscribers.
//! * [`file::JsonFileStore`]: bulk read from a JSON array on disk.
//! * [`rest::RestStore`]: bulk read from the hosted backend's REST API.

pub mod file;
pub mod memory;
pub mod rest;

use std::time::Duration;

use async_trait::async_trait;
use corruption_watch_case_models::CaseRecord;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tokio::sync::mpsc;

/// Errors that can occur while reading from or subscribing to a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The live-update channel could not be opened or failed.
    #[error("Subscription error: {reason}")]
    Subscription {
        /// Why the channel is unavailable.
        reason: String,
    },
}

impl StoreError {
    /// Returns `true` if this error means a bulk read failed, so no
    /// snapshot is available. Callers must not treat it as an empty
    /// collection.
    #[must_use]
    pub const fn is_fetch_error(&self) -> bool {
        !matches!(self, Self::Subscription { .. })
    }
}

/// Kind of change carried by a [`ChangeEvent`].
#[derive(
    Debug,
    Clone,
    Copy,
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ChangeKind {
    /// A new record was added.
    Insert,
    /// An existing record changed; `record` holds the new row.
    Update,
    /// A record was removed; `record` holds the old row.
    Delete,
}

/// One change to the case collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// The affected row (new row for insert/update, old row for delete).
    pub record: CaseRecord,
}

impl ChangeEvent {
    /// Creates an insert event.
    #[must_use]
    pub const fn insert(record: CaseRecord) -> Self {
        Self {
            kind: ChangeKind::Insert,
            record,
        }
    }

    /// Creates an update event.
    #[must_use]
    pub const fn update(record: CaseRecord) -> Self {
        Self {
            kind: ChangeKind::Update,
            record,
        }
    }

    /// Creates a delete event.
    #[must_use]
    pub const fn delete(record: CaseRecord) -> Self {
        Self {
            kind: ChangeKind::Delete,
            record,
        }
    }
}

/// Connection status reported by the live channel.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum ChannelStatus {
    /// The subscription is established and events will follow.
    Subscribed,
    /// The channel failed.
    Error,
    /// The channel timed out.
    TimedOut,
    /// The channel was closed.
    Closed,
}

impl ChannelStatus {
    /// Default human-readable reason for a non-connected status, if any.
    #[must_use]
    pub const fn default_reason(self) -> Option<&'static str> {
        match self {
            Self::Subscribed | Self::Closed => None,
            Self::Error => Some("Failed to connect to realtime updates"),
            Self::TimedOut => Some("Connection timed out"),
        }
    }
}

/// A message delivered on a [`Subscription`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    /// A change to the case collection.
    Change(ChangeEvent),
    /// A connection-status transition.
    Status {
        /// New status.
        status: ChannelStatus,
        /// Optional backend-supplied reason.
        reason: Option<String>,
    },
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// A live stream of [`ChannelMessage`]s, delivered in the order the store
/// emitted them.
///
/// The store-side listener is released exactly once: on [`close`], or on
/// drop if `close` was never called.
///
/// [`close`]: Subscription::close
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<ChannelMessage>,
    release: Option<ReleaseFn>,
}

impl Subscription {
    /// Wraps a receiver together with the callback that detaches the
    /// store-side listener.
    #[must_use]
    pub fn new(
        receiver: mpsc::UnboundedReceiver<ChannelMessage>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Receives the next message, or `None` once the store side is gone
    /// or the subscription was closed.
    pub async fn next(&mut self) -> Option<ChannelMessage> {
        self.receiver.recv().await
    }

    /// Returns the next message if one is already queued.
    pub fn try_next(&mut self) -> Option<ChannelMessage> {
        self.receiver.try_recv().ok()
    }

    /// Detaches the store-side listener. Messages already queued are
    /// discarded.
    pub fn close(&mut self) {
        self.receiver.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish_non_exhaustive()
    }
}

/// A source of case records and of live changes to them.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Returns a short name for logs (e.g. `"memory"`, `"rest"`).
    fn name(&self) -> &str;

    /// Reads every case record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails. A failed read yields no
    /// records at all, never a partial set.
    async fn fetch_all(&self) -> Result<Vec<CaseRecord>, StoreError>;

    /// Opens a live channel of changes to the case collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Subscription`] if this backend cannot
    /// provide live updates or the channel cannot be opened.
    async fn subscribe(&self) -> Result<Subscription, StoreError>;
}

/// Default table holding case rows.
pub const DEFAULT_TABLE: &str = "corruption_cases";

/// Default request timeout for remote reads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL of the backend (e.g. `https://xyz.supabase.co`).
    pub api_url: String,
    /// Anonymous API key.
    pub api_key: String,
    /// Table holding case rows.
    pub table: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl StoreConfig {
    /// Builds a config with the default table and timeout.
    #[must_use]
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads the config from the environment.
    ///
    /// * `CORRUPTION_WATCH_API_URL` (required)
    /// * `CORRUPTION_WATCH_API_KEY` (required)
    /// * `CORRUPTION_WATCH_TABLE` (default `corruption_cases`)
    /// * `CORRUPTION_WATCH_TIMEOUT_SECS` (default 30)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if a required variable is missing or
    /// the timeout is not a number.
    pub fn from_env() -> Result<Self, StoreError> {
        let api_url =
            std::env::var("CORRUPTION_WATCH_API_URL").map_err(|_| StoreError::Config {
                message: "CORRUPTION_WATCH_API_URL not set".to_string(),
            })?;
        let api_key =
            std::env::var("CORRUPTION_WATCH_API_KEY").map_err(|_| StoreError::Config {
                message: "CORRUPTION_WATCH_API_KEY not set".to_string(),
            })?;
        let table =
            std::env::var("CORRUPTION_WATCH_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string());
        let timeout = match std::env::var("CORRUPTION_WATCH_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(secs.trim().parse().map_err(|e| {
                StoreError::Config {
                    message: format!("Invalid CORRUPTION_WATCH_TIMEOUT_SECS '{secs}': {e}"),
                }
            })?),
            Err(_) => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            api_url,
            api_key,
            table,
            timeout,
        })
    }
}
