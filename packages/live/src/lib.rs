#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Keeps dashboard metrics current while case change events stream in.
//!
//! [`LiveUpdateReducer`] is the synchronous core: it holds the known case
//! set, applies insert/update/delete events to it in arrival order, and
//! re-aggregates after each batch. [`spawn_reducer`] drives a reducer from
//! a store [`Subscription`](corruption_watch_store::Subscription) on a
//! background task and hands back a [`LiveHandle`] for reads and shutdown.

pub mod case_set;
pub mod clock;
pub mod reducer;
pub mod task;

pub use case_set::{CaseSet, materialize};
pub use clock::{Clock, FixedClock, SystemClock};
pub use reducer::{ConnectionState, LiveUpdateReducer};
pub use task::{LiveHandle, connect, spawn_reducer};

use corruption_watch_store::StoreError;

/// Errors surfaced by the live layer.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// The store failed to produce the initial snapshot.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The reducer task has stopped and no further updates will arrive.
    #[error("Live reducer is closed")]
    Closed,
}
