#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard metrics snapshot, rollup, and time-series types.
//!
//! These are the immutable outputs of aggregation. Each value is replaced
//! wholesale on recomputation and compared structurally, which is what
//! memoizing callers and the live reducer rely on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Region label used for cases that name no affected region.
pub const UNKNOWN_REGION: &str = "Unknown";

/// Severity above which a case counts as high severity.
pub const HIGH_SEVERITY_THRESHOLD: f64 = 7.0;

/// Granularity for time-series buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGranularity {
    /// One bucket per calendar day, keyed `YYYY-MM-DD`.
    Daily,
    /// One bucket per Sunday-started week, keyed by the week's first day.
    Weekly,
    /// One bucket per calendar month, keyed `YYYY-MM`.
    #[default]
    Monthly,
    /// One bucket per calendar year, keyed `YYYY`.
    Yearly,
}

impl std::fmt::Display for TimeGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "day"),
            Self::Weekly => write!(f, "week"),
            Self::Monthly => write!(f, "month"),
            Self::Yearly => write!(f, "year"),
        }
    }
}

/// Error returned when parsing an unknown [`TimeGranularity`] name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidGranularityError {
    /// The rejected input.
    pub value: String,
}

impl std::fmt::Display for InvalidGranularityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid granularity '{}': expected day, week, month, or year",
            self.value
        )
    }
}

impl std::error::Error for InvalidGranularityError {}

impl std::str::FromStr for TimeGranularity {
    type Err = InvalidGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Daily),
            "week" | "weekly" => Ok(Self::Weekly),
            "month" | "monthly" => Ok(Self::Monthly),
            "year" | "yearly" => Ok(Self::Yearly),
            _ => Err(InvalidGranularityError {
                value: s.to_string(),
            }),
        }
    }
}

/// Summary statistics over a full case collection.
///
/// `Default` is the zero snapshot produced for an empty collection: all
/// counts and rates zero, every `top_*` field `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Number of cases with a usable id.
    pub total_cases: u64,
    /// Cases whose status reads as pending or under investigation.
    pub pending_cases: u64,
    /// Cases whose status reads as closed or completed.
    pub closed_cases: u64,
    /// Everything else. `pending + closed + ongoing == total`.
    pub ongoing_cases: u64,
    /// Sum of estimated losses, missing counted as zero.
    pub total_losses: u64,
    /// Sum of recovered assets, missing counted as zero.
    pub total_recovered: u64,
    /// `total_recovered / total_losses * 100`, or zero without losses.
    pub recovery_rate: f64,
    /// Mean of the present severity scores, or zero if none are present.
    pub average_severity_score: f64,
    /// Cases with severity strictly above [`HIGH_SEVERITY_THRESHOLD`].
    pub high_severity_cases: u64,
    /// Cases created in the reference month.
    pub cases_this_month: u64,
    /// Cases created in the reference year.
    pub cases_this_year: u64,
    /// Cases created in the month before the reference month.
    pub cases_last_month: u64,
    /// Month-over-month growth in percent.
    pub recent_cases_growth: f64,
    /// Most frequent corruption type label.
    pub top_corruption_type: Option<String>,
    /// Most frequent sector label.
    pub top_sector: Option<String>,
    /// Most frequent affected region label.
    pub top_region: Option<String>,
}

impl MetricsSnapshot {
    /// Returns `true` if this is the snapshot of an empty collection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_cases == 0
    }
}

/// Per-region rollup.
///
/// Monetary sums are fractional because a case touching several regions
/// has its amounts split equally between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalData {
    /// Region label, or [`UNKNOWN_REGION`].
    pub region: String,
    /// Cases touching this region.
    pub case_count: u64,
    /// This region's share of estimated losses.
    pub total_losses: f64,
    /// This region's share of recovered assets.
    pub total_recovered: f64,
    /// Mean of present severity scores of cases in this region.
    pub average_severity_score: f64,
    /// `total_recovered / total_losses * 100`, or zero without losses.
    pub recovery_rate: f64,
    /// Distinct government levels seen, sorted.
    pub government_levels: Vec<String>,
    /// Distinct corruption type labels seen, sorted.
    pub corruption_types: Vec<String>,
    /// Case counts keyed by raw status label (`unknown` when absent).
    pub cases_by_status: BTreeMap<String, u64>,
    /// Case counts keyed by corruption type label (`unknown` when none).
    pub cases_by_type: BTreeMap<String, u64>,
}

/// Per-sector rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorData {
    /// Sector label.
    pub sector: String,
    /// Cases in this sector.
    pub case_count: u64,
    /// Sum of estimated losses.
    pub total_losses: u64,
    /// Sum of recovered assets.
    pub total_recovered: u64,
    /// Mean of present severity scores.
    pub average_severity_score: f64,
    /// `total_recovered / total_losses * 100`, or zero without losses.
    pub recovery_rate: f64,
    /// Distinct government levels seen, sorted.
    pub government_levels: Vec<String>,
    /// Distinct corruption type labels seen, sorted.
    pub corruption_types: Vec<String>,
}

/// A time-series data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// Bucket key (e.g. "2025-01", "2025-01-12", "2025").
    pub period: String,
    /// Cases in this bucket.
    pub count: u64,
    /// Sum of estimated losses in this bucket.
    pub total_losses: u64,
    /// Mean of present severity scores in this bucket.
    pub average_severity_score: f64,
}

/// Everything one aggregation pass produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    /// Global summary.
    pub snapshot: MetricsSnapshot,
    /// Regional rollups, most cases first.
    pub regions: Vec<RegionalData>,
    /// Sector rollups, highest losses first.
    pub sectors: Vec<SectorData>,
    /// Time buckets in ascending key order.
    pub time_series: Vec<TimeSeriesPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_parses_both_spellings() {
        assert_eq!("day".parse(), Ok(TimeGranularity::Daily));
        assert_eq!("Weekly".parse(), Ok(TimeGranularity::Weekly));
        assert_eq!("MONTH".parse(), Ok(TimeGranularity::Monthly));
        assert_eq!("yearly".parse(), Ok(TimeGranularity::Yearly));
        assert!("quarter".parse::<TimeGranularity>().is_err());
        assert_eq!(TimeGranularity::Weekly.to_string(), "week");
    }

    #[test]
    fn default_snapshot_is_zero() {
        let snapshot = MetricsSnapshot::default();
        assert!(snapshot.is_empty());
        assert!(snapshot.top_region.is_none());
        assert!(snapshot.recovery_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(MetricsSnapshot::default()).unwrap();
        assert_eq!(json["totalCases"], 0);
        assert!(json["topCorruptionType"].is_null());
        assert!(json.get("recentCasesGrowth").is_some());
    }
}
