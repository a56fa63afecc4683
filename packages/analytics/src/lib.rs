#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Severity scoring and dashboard aggregation over corruption case records.
//!
//! [`severity`] derives a 0-10 score for a single case. [`aggregate`]
//! folds a whole collection into a [`MetricsSnapshot`] plus regional,
//! sector, and time-series rollups. [`filter`] and [`format`] hold the
//! smaller helpers the dashboard uses around those results.
//!
//! Nothing in this crate performs I/O, reads the clock, or fails.
//!
//! [`MetricsSnapshot`]: corruption_watch_analytics_models::MetricsSnapshot

pub mod aggregate;
pub mod filter;
pub mod format;
pub mod severity;

pub use aggregate::{AggregateOptions, SeverityPolicy, aggregate, aggregate_with};
