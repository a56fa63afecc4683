//! Folds a case collection into the dashboard's summary metrics, regional
//! and sector rollups, and time-series buckets.
//!
//! Every function here is pure: it reads the input slice and returns a
//! freshly allocated result. The reference instant for "this month" is
//! always passed in by the caller and read once.
//!
//! Records without an id are skipped by every fold.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Datelike as _, Duration, Utc};
use corruption_watch_analytics_models::{
    AggregateReport, HIGH_SEVERITY_THRESHOLD, MetricsSnapshot, RegionalData, SectorData,
    TimeGranularity, TimeSeriesPoint, UNKNOWN_REGION,
};
use corruption_watch_case_models::{CaseRecord, DateField, StatusClass};

use crate::severity;

/// Label used for a missing status or an empty type list in regional
/// breakdowns.
const UNKNOWN_LABEL: &str = "unknown";

/// Whether missing severity scores are derived before aggregating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeverityPolicy {
    /// Only precomputed scores count toward averages and thresholds.
    #[default]
    PresentOnly,
    /// Cases without a score are scored with [`severity::score`] first.
    DeriveMissing,
}

/// Knobs for one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Timestamp used to place cases into time buckets.
    pub date_field: DateField,
    /// Bucket width of the time series.
    pub granularity: TimeGranularity,
    /// Handling of cases without a precomputed severity.
    pub severity: SeverityPolicy,
}

/// Keyed accumulators that remember first-insertion order, so ties can be
/// broken by which key was seen first.
struct Groups<T> {
    entries: Vec<(String, T)>,
    index: HashMap<String, usize>,
}

impl<T: Default> Groups<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn entry(&mut self, key: &str) -> &mut T {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.to_string(), T::default()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    fn into_entries(self) -> Vec<(String, T)> {
        self.entries
    }
}

impl Groups<u64> {
    fn increment(&mut self, key: &str) {
        *self.entry(key) += 1;
    }

    /// Returns the key with the highest count, the earliest-seen key on
    /// ties, or `None` when empty.
    fn top(&self) -> Option<String> {
        let mut best: Option<&(String, u64)> = None;
        for entry in &self.entries {
            if best.is_none_or(|b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(key, _)| key.clone())
    }
}

/// Running mean over the present values.
#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    n: u64,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.n += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn value(self) -> f64 {
        if self.n == 0 { 0.0 } else { self.sum / self.n as f64 }
    }
}

fn identified(cases: &[CaseRecord]) -> impl Iterator<Item = &CaseRecord> {
    cases.iter().filter(|case| case.has_identity())
}

/// Distinct non-blank labels in first-seen order.
fn distinct_labels(labels: &[String]) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    labels
        .iter()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty() && seen.insert(*label))
        .collect()
}

fn non_blank(label: Option<&String>) -> Option<&str> {
    label.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn rate(recovered: f64, losses: f64) -> f64 {
    if losses > 0.0 {
        recovered / losses * 100.0
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn growth(this_month: u64, last_month: u64) -> f64 {
    if last_month > 0 {
        (this_month as f64 - last_month as f64) / last_month as f64 * 100.0
    } else if this_month > 0 {
        100.0
    } else {
        0.0
    }
}

/// Returns `(year, month)` of the calendar month before `year`/`month`.
const fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Computes the global summary of `cases` relative to `now`.
///
/// Monetary totals use each case's full amounts, no matter how many
/// regions it touches. A case with several corruption types counts once
/// toward each of them when picking the top type.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_metrics(cases: &[CaseRecord], now: DateTime<Utc>) -> MetricsSnapshot {
    let (year, month) = (now.year(), now.month());
    let (last_year, last_month) = previous_month(year, month);

    let mut snapshot = MetricsSnapshot::default();
    let mut severity = Mean::default();
    let mut types = Groups::<u64>::new();
    let mut sectors = Groups::<u64>::new();
    let mut regions = Groups::<u64>::new();

    for case in identified(cases) {
        snapshot.total_cases += 1;

        match case.status_class() {
            StatusClass::Pending => snapshot.pending_cases += 1,
            StatusClass::Closed => snapshot.closed_cases += 1,
            StatusClass::Ongoing => snapshot.ongoing_cases += 1,
        }

        snapshot.total_losses = snapshot
            .total_losses
            .saturating_add(case.estimated_losses.unwrap_or(0));
        snapshot.total_recovered = snapshot
            .total_recovered
            .saturating_add(case.asset_recovery.unwrap_or(0));

        severity.push(case.severity_score);
        if case
            .severity_score
            .is_some_and(|score| score > HIGH_SEVERITY_THRESHOLD)
        {
            snapshot.high_severity_cases += 1;
        }

        if case.created_at.is_some_and(|created| created.year() == year) {
            snapshot.cases_this_year += 1;
        }
        if case.created_in_month(year, month) {
            snapshot.cases_this_month += 1;
        }
        if case.created_in_month(last_year, last_month) {
            snapshot.cases_last_month += 1;
        }

        for label in distinct_labels(&case.corruption_type) {
            types.increment(label);
        }
        if let Some(sector) = non_blank(case.sector.as_ref()) {
            sectors.increment(sector);
        }
        for region in distinct_labels(&case.regions_affected) {
            regions.increment(region);
        }
    }

    snapshot.recovery_rate = rate(
        snapshot.total_recovered as f64,
        snapshot.total_losses as f64,
    );
    snapshot.average_severity_score = severity.value();
    snapshot.recent_cases_growth = growth(snapshot.cases_this_month, snapshot.cases_last_month);
    snapshot.top_corruption_type = types.top();
    snapshot.top_sector = sectors.top();
    snapshot.top_region = regions.top();

    snapshot
}

#[derive(Default)]
struct RegionAcc {
    case_count: u64,
    losses: f64,
    recovered: f64,
    severity: Mean,
    government_levels: BTreeSet<String>,
    corruption_types: BTreeSet<String>,
    cases_by_status: BTreeMap<String, u64>,
    cases_by_type: BTreeMap<String, u64>,
}

/// Rolls cases up per affected region.
///
/// A case touching `n` regions adds `1/n` of its losses and recovered
/// assets to each, so summing a case's shares across regions gives back
/// its own amounts. Cases naming no region go to [`UNKNOWN_REGION`] with
/// their full amounts. Rows are ordered by case count, most first; ties
/// keep first-seen order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_regions(cases: &[CaseRecord]) -> Vec<RegionalData> {
    let mut groups = Groups::<RegionAcc>::new();

    for case in identified(cases) {
        let mut regions = distinct_labels(&case.regions_affected);
        if regions.is_empty() {
            regions.push(UNKNOWN_REGION);
        }
        let share = regions.len() as f64;
        let losses = case.estimated_losses.unwrap_or(0) as f64 / share;
        let recovered = case.asset_recovery.unwrap_or(0) as f64 / share;
        let status = non_blank(case.case_status.as_ref()).unwrap_or(UNKNOWN_LABEL);
        let types = distinct_labels(&case.corruption_type);
        let level = non_blank(case.government_level.as_ref());

        for region in regions {
            let acc = groups.entry(region);
            acc.case_count += 1;
            acc.losses += losses;
            acc.recovered += recovered;
            acc.severity.push(case.severity_score);
            if let Some(level) = level {
                acc.government_levels.insert(level.to_string());
            }
            *acc.cases_by_status.entry(status.to_string()).or_default() += 1;
            if types.is_empty() {
                *acc.cases_by_type.entry(UNKNOWN_LABEL.to_string()).or_default() += 1;
            }
            for label in &types {
                acc.corruption_types.insert((*label).to_string());
                *acc.cases_by_type.entry((*label).to_string()).or_default() += 1;
            }
        }
    }

    let mut rows: Vec<RegionalData> = groups
        .into_entries()
        .into_iter()
        .map(|(region, acc)| RegionalData {
            region,
            case_count: acc.case_count,
            total_losses: acc.losses,
            total_recovered: acc.recovered,
            average_severity_score: acc.severity.value(),
            recovery_rate: rate(acc.recovered, acc.losses),
            government_levels: acc.government_levels.into_iter().collect(),
            corruption_types: acc.corruption_types.into_iter().collect(),
            cases_by_status: acc.cases_by_status,
            cases_by_type: acc.cases_by_type,
        })
        .collect();

    rows.sort_by(|a, b| b.case_count.cmp(&a.case_count));
    rows
}

#[derive(Default)]
struct SectorAcc {
    case_count: u64,
    losses: u64,
    recovered: u64,
    severity: Mean,
    government_levels: BTreeSet<String>,
    corruption_types: BTreeSet<String>,
}

/// Rolls cases up per sector. Cases without a sector are left out. Rows
/// are ordered by total losses, highest first; ties keep first-seen order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_sectors(cases: &[CaseRecord]) -> Vec<SectorData> {
    let mut groups = Groups::<SectorAcc>::new();

    for case in identified(cases) {
        let Some(sector) = non_blank(case.sector.as_ref()) else {
            continue;
        };
        let acc = groups.entry(sector);
        acc.case_count += 1;
        acc.losses = acc.losses.saturating_add(case.estimated_losses.unwrap_or(0));
        acc.recovered = acc
            .recovered
            .saturating_add(case.asset_recovery.unwrap_or(0));
        acc.severity.push(case.severity_score);
        if let Some(level) = non_blank(case.government_level.as_ref()) {
            acc.government_levels.insert(level.to_string());
        }
        for label in distinct_labels(&case.corruption_type) {
            acc.corruption_types.insert(label.to_string());
        }
    }

    let mut rows: Vec<SectorData> = groups
        .into_entries()
        .into_iter()
        .map(|(sector, acc)| SectorData {
            sector,
            case_count: acc.case_count,
            total_losses: acc.losses,
            total_recovered: acc.recovered,
            average_severity_score: acc.severity.value(),
            recovery_rate: rate(acc.recovered as f64, acc.losses as f64),
            government_levels: acc.government_levels.into_iter().collect(),
            corruption_types: acc.corruption_types.into_iter().collect(),
        })
        .collect();

    rows.sort_by(|a, b| b.total_losses.cmp(&a.total_losses));
    rows
}

/// Returns the sector with the highest total losses.
#[must_use]
pub fn top_sector_by_losses(sectors: &[SectorData]) -> Option<&SectorData> {
    sectors.iter().reduce(|best, s| {
        if s.total_losses > best.total_losses {
            s
        } else {
            best
        }
    })
}

/// Returns the sector with the most cases.
#[must_use]
pub fn top_sector_by_cases(sectors: &[SectorData]) -> Option<&SectorData> {
    sectors
        .iter()
        .reduce(|best, s| if s.case_count > best.case_count { s } else { best })
}

/// Returns the bucket key of `at` for the given granularity.
#[must_use]
pub fn bucket_key(at: DateTime<Utc>, granularity: TimeGranularity) -> String {
    match granularity {
        TimeGranularity::Daily => at.format("%Y-%m-%d").to_string(),
        TimeGranularity::Weekly => {
            let offset = i64::from(at.weekday().num_days_from_sunday());
            (at - Duration::days(offset)).format("%Y-%m-%d").to_string()
        }
        TimeGranularity::Monthly => at.format("%Y-%m").to_string(),
        TimeGranularity::Yearly => at.format("%Y").to_string(),
    }
}

#[derive(Default)]
struct BucketAcc {
    count: u64,
    losses: u64,
    severity: Mean,
}

/// Buckets cases by the timestamp selected by `date_field`. Cases without
/// that timestamp are left out. Points come back in ascending key order.
#[must_use]
pub fn build_time_series(
    cases: &[CaseRecord],
    date_field: DateField,
    granularity: TimeGranularity,
) -> Vec<TimeSeriesPoint> {
    let mut buckets: BTreeMap<String, BucketAcc> = BTreeMap::new();

    for case in identified(cases) {
        let Some(at) = case.date(date_field) else {
            continue;
        };
        let acc = buckets.entry(bucket_key(at, granularity)).or_default();
        acc.count += 1;
        acc.losses = acc.losses.saturating_add(case.estimated_losses.unwrap_or(0));
        acc.severity.push(case.severity_score);
    }

    buckets
        .into_iter()
        .map(|(period, acc)| TimeSeriesPoint {
            period,
            count: acc.count,
            total_losses: acc.losses,
            average_severity_score: acc.severity.value(),
        })
        .collect()
}

/// Runs every fold over `cases` with default options for severity.
#[must_use]
pub fn aggregate(
    cases: &[CaseRecord],
    now: DateTime<Utc>,
    date_field: DateField,
    granularity: TimeGranularity,
) -> AggregateReport {
    aggregate_with(
        cases,
        now,
        &AggregateOptions {
            date_field,
            granularity,
            severity: SeverityPolicy::PresentOnly,
        },
    )
}

/// Runs every fold over `cases` with explicit options.
#[must_use]
pub fn aggregate_with(
    cases: &[CaseRecord],
    now: DateTime<Utc>,
    options: &AggregateOptions,
) -> AggregateReport {
    let skipped = cases.iter().filter(|case| !case.has_identity()).count();
    if skipped > 0 {
        log::warn!("Skipping {skipped} case record(s) without an id");
    }

    let derived;
    let cases = match options.severity {
        SeverityPolicy::PresentOnly => cases,
        SeverityPolicy::DeriveMissing => {
            derived = cases
                .iter()
                .map(|case| {
                    let mut case = case.clone();
                    if case.severity_score.is_none() {
                        case.severity_score = Some(severity::score(&case));
                    }
                    case
                })
                .collect::<Vec<_>>();
            derived.as_slice()
        }
    };

    log::debug!(
        "Aggregating {} case(s) by {} / {}",
        cases.len() - skipped,
        options.date_field,
        options.granularity
    );

    AggregateReport {
        snapshot: compute_metrics(cases, now),
        regions: aggregate_regions(cases),
        sectors: aggregate_sectors(cases),
        time_series: build_time_series(cases, options.date_field, options.granularity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corruption_watch_case_models::decode::parse_timestamp;

    const TOLERANCE: f64 = 1e-9;

    fn at(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    fn case(id: &str) -> CaseRecord {
        CaseRecord::new(id)
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn empty_input_yields_zero_report() {
        let report = aggregate(
            &[],
            at("2025-06-15"),
            DateField::PublishedDate,
            TimeGranularity::Monthly,
        );
        assert_eq!(report.snapshot, MetricsSnapshot::default());
        assert!(report.regions.is_empty());
        assert!(report.sectors.is_empty());
        assert!(report.time_series.is_empty());
    }

    #[test]
    fn status_counts_and_losses() {
        let mut closed = case("1");
        closed.estimated_losses = Some(1_000_000_000);
        closed.case_status = Some("closed".to_string());
        let mut pending = case("2");
        pending.estimated_losses = Some(500_000_000);
        pending.case_status = Some("investigation".to_string());

        let snapshot = compute_metrics(&[closed, pending], at("2025-06-15"));

        assert_eq!(snapshot.total_cases, 2);
        assert_eq!(snapshot.closed_cases, 1);
        assert_eq!(snapshot.pending_cases, 1);
        assert_eq!(snapshot.ongoing_cases, 0);
        assert_eq!(snapshot.total_losses, 1_500_000_000);
        assert!(snapshot.recovery_rate.abs() < TOLERANCE);
    }

    #[test]
    fn status_classes_partition_total() {
        let statuses = [
            Some("pending"),
            Some("trial"),
            Some("completed"),
            None,
            Some("under investigation"),
            Some("Closed - acquitted"),
        ];
        let cases: Vec<CaseRecord> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut c = case(&i.to_string());
                c.case_status = status.map(str::to_string);
                c
            })
            .collect();

        let s = compute_metrics(&cases, at("2025-01-01"));

        assert_eq!(s.pending_cases + s.closed_cases + s.ongoing_cases, s.total_cases);
        assert_eq!((s.pending_cases, s.closed_cases, s.ongoing_cases), (2, 2, 2));
    }

    #[test]
    fn recovery_rate_is_zero_without_losses() {
        let mut c = case("1");
        c.asset_recovery = Some(5_000);
        let snapshot = compute_metrics(&[c], at("2025-01-01"));
        assert_eq!(snapshot.total_recovered, 5_000);
        assert!(snapshot.recovery_rate.abs() < TOLERANCE);
    }

    #[test]
    fn recovery_rate_and_severity_average() {
        let mut a = case("a");
        a.estimated_losses = Some(400);
        a.asset_recovery = Some(100);
        a.severity_score = Some(8.0);
        let mut b = case("b");
        b.estimated_losses = Some(600);
        b.severity_score = Some(6.0);
        let c = case("c");

        let s = compute_metrics(&[a, b, c], at("2025-01-01"));

        assert!((s.recovery_rate - 10.0).abs() < TOLERANCE);
        assert!((s.average_severity_score - 7.0).abs() < TOLERANCE);
        assert_eq!(s.high_severity_cases, 1);
    }

    #[test]
    fn month_buckets_follow_injected_now() {
        let mut cases = Vec::new();
        for (id, created) in [
            ("1", "2025-03-02T08:00:00Z"),
            ("2", "2025-03-31T23:59:59Z"),
            ("3", "2025-02-14T12:00:00Z"),
            ("4", "2024-03-10T12:00:00Z"),
        ] {
            let mut c = case(id);
            c.created_at = Some(at(created));
            cases.push(c);
        }

        let s = compute_metrics(&cases, at("2025-03-15T00:00:00Z"));

        assert_eq!(s.cases_this_month, 2);
        assert_eq!(s.cases_last_month, 1);
        assert_eq!(s.cases_this_year, 3);
        assert!((s.recent_cases_growth - 100.0).abs() < TOLERANCE);
    }

    #[test]
    fn last_month_wraps_across_january() {
        let mut dec = case("1");
        dec.created_at = Some(at("2024-12-20"));
        let s = compute_metrics(&[dec], at("2025-01-05"));
        assert_eq!(s.cases_last_month, 1);
        assert_eq!(s.cases_this_month, 0);
        assert_eq!(s.cases_this_year, 0);
        assert!((s.recent_cases_growth + 100.0).abs() < TOLERANCE);
    }

    #[test]
    fn growth_without_last_month() {
        assert!((growth(3, 0) - 100.0).abs() < TOLERANCE);
        assert!(growth(0, 0).abs() < TOLERANCE);
        assert!((growth(3, 2) - 50.0).abs() < TOLERANCE);
    }

    #[test]
    fn top_labels_count_each_membership_and_break_ties_by_first_seen() {
        let mut a = case("a");
        a.corruption_type = labels(&["fraud", "bribery"]);
        a.sector = Some("health".to_string());
        a.regions_affected = labels(&["Bali"]);
        let mut b = case("b");
        b.corruption_type = labels(&["bribery"]);
        b.sector = Some("education".to_string());
        b.regions_affected = labels(&["Aceh"]);

        let s = compute_metrics(&[a, b], at("2025-01-01"));

        assert_eq!(s.top_corruption_type.as_deref(), Some("bribery"));
        assert_eq!(s.top_sector.as_deref(), Some("health"));
        assert_eq!(s.top_region.as_deref(), Some("Bali"));
    }

    #[test]
    fn top_labels_are_none_without_data() {
        let s = compute_metrics(&[case("a")], at("2025-01-01"));
        assert!(s.top_corruption_type.is_none());
        assert!(s.top_sector.is_none());
        assert!(s.top_region.is_none());
    }

    #[test]
    fn records_without_id_are_skipped() {
        let mut anonymous = case("");
        anonymous.estimated_losses = Some(10);
        let report = aggregate(
            &[anonymous, case("1")],
            at("2025-01-01"),
            DateField::CreatedAt,
            TimeGranularity::Daily,
        );
        assert_eq!(report.snapshot.total_cases, 1);
        assert_eq!(report.snapshot.total_losses, 0);
        assert_eq!(report.regions.len(), 1);
    }

    #[test]
    fn multi_region_losses_are_split_and_conserved() {
        let mut c = case("1");
        c.estimated_losses = Some(1_000_000_001);
        c.asset_recovery = Some(10);
        c.regions_affected = labels(&["Jakarta", "Banten", "Jawa Barat"]);

        let regions = aggregate_regions(std::slice::from_ref(&c));
        let total: f64 = regions.iter().map(|r| r.total_losses).sum();

        assert_eq!(regions.len(), 3);
        assert!((total - 1_000_000_001.0).abs() < 1e-3);
        let recovered: f64 = regions.iter().map(|r| r.total_recovered).sum();
        assert!((recovered - 10.0).abs() < 1e-9);

        let snapshot = compute_metrics(&[c], at("2025-01-01"));
        assert_eq!(snapshot.total_losses, 1_000_000_001);
    }

    #[test]
    fn cases_without_regions_go_to_unknown() {
        let mut c = case("1");
        c.estimated_losses = Some(700);
        c.case_status = Some("trial".to_string());

        let regions = aggregate_regions(&[c]);

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region, UNKNOWN_REGION);
        assert!((regions[0].total_losses - 700.0).abs() < TOLERANCE);
        assert_eq!(regions[0].cases_by_status.get("trial"), Some(&1));
        assert_eq!(regions[0].cases_by_type.get("unknown"), Some(&1));
    }

    #[test]
    fn regions_sorted_by_case_count() {
        let mut a = case("a");
        a.regions_affected = labels(&["Papua"]);
        let mut b = case("b");
        b.regions_affected = labels(&["Riau", "Papua"]);
        b.government_level = Some("provincial".to_string());
        b.corruption_type = labels(&["bribery"]);
        b.severity_score = Some(6.0);

        let regions = aggregate_regions(&[a, b]);

        assert_eq!(regions[0].region, "Papua");
        assert_eq!(regions[0].case_count, 2);
        assert_eq!(regions[1].region, "Riau");
        assert_eq!(regions[1].government_levels, vec!["provincial"]);
        assert_eq!(regions[1].corruption_types, vec!["bribery"]);
        assert!((regions[1].average_severity_score - 6.0).abs() < TOLERANCE);
    }

    #[test]
    fn sectors_rollup_and_leaders() {
        let mut a = case("a");
        a.sector = Some("energy".to_string());
        a.estimated_losses = Some(100);
        a.asset_recovery = Some(50);
        let mut b = case("b");
        b.sector = Some("health".to_string());
        b.estimated_losses = Some(900);
        let mut c = case("c");
        c.sector = Some("energy".to_string());
        c.estimated_losses = Some(200);
        c.government_level = Some("city".to_string());
        c.corruption_type = labels(&["nepotism", "fraud"]);
        let d = case("d");

        let sectors = aggregate_sectors(&[a, b, c, d]);

        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors[0].sector, "health");
        assert_eq!(sectors[1].sector, "energy");
        assert_eq!(sectors[1].case_count, 2);
        assert_eq!(sectors[1].total_losses, 300);
        assert!((sectors[1].recovery_rate - 50.0 / 3.0).abs() < 1e-9);
        assert_eq!(sectors[1].corruption_types, vec!["fraud", "nepotism"]);
        assert_eq!(top_sector_by_losses(&sectors).unwrap().sector, "health");
        assert_eq!(top_sector_by_cases(&sectors).unwrap().sector, "energy");
        assert!(top_sector_by_cases(&[]).is_none());
    }

    #[test]
    fn bucket_keys_per_granularity() {
        // 2025-03-05 is a Wednesday; its week starts Sunday 2025-03-02.
        let t = at("2025-03-05T10:00:00Z");
        assert_eq!(bucket_key(t, TimeGranularity::Daily), "2025-03-05");
        assert_eq!(bucket_key(t, TimeGranularity::Weekly), "2025-03-02");
        assert_eq!(bucket_key(t, TimeGranularity::Monthly), "2025-03");
        assert_eq!(bucket_key(t, TimeGranularity::Yearly), "2025");
        let sunday = at("2025-03-02T00:00:00Z");
        assert_eq!(bucket_key(sunday, TimeGranularity::Weekly), "2025-03-02");
    }

    #[test]
    fn time_series_sorted_and_averaged() {
        let mut cases = Vec::new();
        for (id, date, losses, score) in [
            ("1", "2025-02-10", 10, Some(4.0)),
            ("2", "2024-11-01", 5, None),
            ("3", "2025-02-20", 30, Some(8.0)),
        ] {
            let mut c = case(id);
            c.published_date = Some(at(date));
            c.estimated_losses = Some(losses);
            c.severity_score = score;
            cases.push(c);
        }
        cases.push(case("undated"));

        let series = build_time_series(&cases, DateField::PublishedDate, TimeGranularity::Monthly);

        let periods: Vec<&str> = series.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-11", "2025-02"]);
        assert_eq!(series[1].count, 2);
        assert_eq!(series[1].total_losses, 40);
        assert!((series[1].average_severity_score - 6.0).abs() < TOLERANCE);
        assert!(series[0].average_severity_score.abs() < TOLERANCE);
    }

    #[test]
    fn derive_missing_policy_fills_scores() {
        let mut c = case("1");
        c.government_level = Some("national".to_string());
        c.case_status = Some("convicted".to_string());

        let options = AggregateOptions {
            severity: SeverityPolicy::DeriveMissing,
            ..AggregateOptions::default()
        };
        let derived = aggregate_with(std::slice::from_ref(&c), at("2025-01-01"), &options);
        let present = aggregate_with(&[c], at("2025-01-01"), &AggregateOptions::default());

        assert!((derived.snapshot.average_severity_score - 4.0).abs() < TOLERANCE);
        assert!(present.snapshot.average_severity_score.abs() < TOLERANCE);
    }
}
