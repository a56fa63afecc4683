//! Output shapes for the CLI subcommands.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use corruption_watch_analytics::aggregate::{top_sector_by_cases, top_sector_by_losses};
use corruption_watch_analytics::format::format_idr;
use corruption_watch_analytics::severity::{self, SeverityBreakdown};
use corruption_watch_analytics_models::{AggregateReport, MetricsSnapshot};
use corruption_watch_case_models::CaseRecord;
use corruption_watch_live::{Clock, ConnectionState, LiveError, connect};
use corruption_watch_store::file::JsonFileStore;
use corruption_watch_store::memory::MemoryStore;
use corruption_watch_store::{CaseStore, ChangeEvent, StoreError};
use serde::Serialize;

/// Errors from `replay`.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Reading the event log failed.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Event log path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The event log is not a JSON array of change events.
    #[error("Invalid event log: {0}")]
    Json(#[from] serde_json::Error),

    /// Loading the initial records failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The reducer stopped before consuming every event.
    #[error(transparent)]
    Live(#[from] LiveError),
}

/// Derived severity of one case next to its stored score.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCase {
    pub id: String,
    pub title: String,
    pub stored_score: Option<f64>,
    pub derived: SeverityBreakdown,
}

/// Scores every case.
pub fn scores(cases: &[CaseRecord]) -> Vec<ScoredCase> {
    cases
        .iter()
        .filter(|case| case.has_identity())
        .map(|case| ScoredCase {
            id: case.id.clone(),
            title: case.title.clone(),
            stored_score: case.severity_score,
            derived: severity::breakdown(case),
        })
        .collect()
}

/// State of the live reducer after a replay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutcome {
    pub snapshot: MetricsSnapshot,
    pub update_count: u64,
    pub last_update: Option<CaseRecord>,
    pub connection: ConnectionState,
}

/// Publishes every event in the log at `events` through an in-memory
/// store and returns what a live reducer subscribed to it converged to.
pub async fn replay(
    events: &Path,
    initial: Option<&Path>,
    clock: Arc<dyn Clock>,
) -> Result<ReplayOutcome, ReplayError> {
    let body = tokio::fs::read_to_string(events)
        .await
        .map_err(|source| ReplayError::Read {
            path: events.display().to_string(),
            source,
        })?;
    let log: Vec<ChangeEvent> = serde_json::from_str(&body)?;

    let seed = match initial {
        Some(path) => JsonFileStore::new(path).fetch_all().await?,
        None => Vec::new(),
    };
    let store = MemoryStore::with_cases(seed);
    let mut handle = connect(&store, clock, Default::default()).await?;

    let published = u64::try_from(log.len()).unwrap_or(u64::MAX);
    for event in log {
        store.apply(event);
    }
    log::info!("Published {published} event(s)");

    handle
        .wait_until(|reducer| reducer.update_count() >= published)
        .await?;
    handle.close().await;

    Ok(ReplayOutcome {
        snapshot: handle.snapshot(),
        update_count: handle.update_count(),
        last_update: handle.last_update(),
        connection: handle.state(),
    })
}

/// Renders a report as readable text.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn render(report: &AggregateReport) -> String {
    let s = &report.snapshot;
    let mut out = String::new();

    let _ = writeln!(out, "Cases:            {}", s.total_cases);
    let _ = writeln!(
        out,
        "  pending {} / ongoing {} / closed {}",
        s.pending_cases, s.ongoing_cases, s.closed_cases
    );
    let _ = writeln!(out, "Losses:           {}", format_idr(s.total_losses, false));
    let _ = writeln!(
        out,
        "Recovered:        {} ({:.1}%)",
        format_idr(s.total_recovered, false),
        s.recovery_rate
    );
    let _ = writeln!(
        out,
        "Severity:         {:.2} avg, {} high",
        s.average_severity_score, s.high_severity_cases
    );
    let _ = writeln!(
        out,
        "This month:       {} ({:+.1}% vs {} last month)",
        s.cases_this_month, s.recent_cases_growth, s.cases_last_month
    );
    let _ = writeln!(out, "This year:        {}", s.cases_this_year);
    let _ = writeln!(
        out,
        "Top type:         {}",
        s.top_corruption_type.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "Top region:       {}",
        s.top_region.as_deref().unwrap_or("-")
    );

    if let Some(sector) = top_sector_by_losses(&report.sectors) {
        let _ = writeln!(
            out,
            "Costliest sector: {} ({})",
            sector.sector,
            format_idr(sector.total_losses, true)
        );
    }
    if let Some(sector) = top_sector_by_cases(&report.sectors) {
        let _ = writeln!(
            out,
            "Busiest sector:   {} ({} cases)",
            sector.sector, sector.case_count
        );
    }

    if !report.regions.is_empty() {
        let _ = writeln!(out, "\nRegions:");
        for region in &report.regions {
            let _ = writeln!(
                out,
                "  {:<24} {:>5} {:>16}",
                region.region,
                region.case_count,
                format_idr(region.total_losses.round() as u64, true)
            );
        }
    }

    if !report.time_series.is_empty() {
        let _ = writeln!(out, "\nTimeline:");
        for point in &report.time_series {
            let _ = writeln!(out, "  {:<12} {:>5}", point.period, point.count);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use corruption_watch_analytics::aggregate;
    use corruption_watch_case_models::decode::parse_timestamp;
    use corruption_watch_live::FixedClock;

    fn temp_file(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("events-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn replay_converges_on_the_final_case_set() {
        let events = temp_file(
            r#"[
                {"kind": "insert", "record": {"id": "a", "case_status": "pending", "estimated_losses_idr": 100}},
                {"kind": "insert", "record": {"id": "b", "case_status": "closed"}},
                {"kind": "update", "record": {"id": "a", "case_status": "closed", "estimated_losses_idr": 50}},
                {"kind": "delete", "record": {"id": "missing"}},
                {"kind": "delete", "record": {"id": "b"}}
            ]"#,
        );
        let now = parse_timestamp("2025-06-01").unwrap();

        let outcome = replay(&events, None, Arc::new(FixedClock(now)))
            .await
            .unwrap();
        std::fs::remove_file(&events).unwrap();

        assert_eq!(outcome.update_count, 5);
        assert_eq!(outcome.snapshot.total_cases, 1);
        assert_eq!(outcome.snapshot.closed_cases, 1);
        assert_eq!(outcome.snapshot.total_losses, 50);
        assert_eq!(outcome.connection, ConnectionState::Disconnected);
        assert_eq!(outcome.last_update.map(|c| c.id), Some("b".to_string()));
    }

    #[test]
    fn renders_headline_numbers() {
        let mut case = CaseRecord::new("a");
        case.estimated_losses = Some(2_000_000);
        case.sector = Some("energy".to_string());
        case.regions_affected = vec!["Jakarta".to_string()];
        let report = aggregate(
            &[case],
            parse_timestamp("2025-06-01").unwrap(),
            Default::default(),
            Default::default(),
        );

        let text = render(&report);

        assert!(text.contains("Losses:           Rp 2.000.000"));
        assert!(text.contains("Costliest sector: energy (Rp 2 jt)"));
        assert!(text.contains("Jakarta"));
    }

    #[test]
    fn scores_skip_anonymous_rows() {
        let mut rated = CaseRecord::new("a");
        rated.government_level = Some("national".to_string());
        let scored = scores(&[rated, CaseRecord::new("")]);
        assert_eq!(scored.len(), 1);
        assert!((scored[0].derived.total - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn replay_counts_deletes_of_unknown_cases() {
        let events = temp_file(
            r#"[
                {"kind": "insert", "record": {"id": "a"}},
                {"kind": "delete", "record": {"id": "ghost"}}
            ]"#,
        );
        let now = parse_timestamp("2025-06-01").unwrap();

        let outcome = replay(&events, None, Arc::new(FixedClock(now)))
            .await
            .unwrap();
        std::fs::remove_file(&events).unwrap();

        assert_eq!(outcome.update_count, 2);
        assert_eq!(outcome.snapshot.total_cases, 1);
        assert_eq!(outcome.last_update.map(|c| c.id), Some("ghost".to_string()));
    }
}
