#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the corruption case dashboard metrics.
//!
//! ```text
//! corruption_watch summary --input cases.json [--granularity week] [--text]
//! corruption_watch fetch [--date-field created_at]
//! corruption_watch score --input cases.json
//! corruption_watch values --input cases.json --field sector
//! corruption_watch replay --events events.json [--initial cases.json]
//! ```
//!
//! `fetch` reads from the hosted backend configured through
//! `CORRUPTION_WATCH_API_URL` and `CORRUPTION_WATCH_API_KEY`.

mod report;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use corruption_watch_analytics::filter::{CaseField, filter_cases_by_status, unique_field_values};
use corruption_watch_analytics::{AggregateOptions, SeverityPolicy, aggregate_with};
use corruption_watch_analytics_models::TimeGranularity;
use corruption_watch_case_models::{CaseRecord, DateField, decode::parse_timestamp};
use corruption_watch_live::{Clock, FixedClock, SystemClock};
use corruption_watch_store::file::JsonFileStore;
use corruption_watch_store::rest::RestStore;
use corruption_watch_store::{CaseStore, StoreConfig};

#[derive(Parser)]
#[command(
    name = "corruption_watch",
    about = "Aggregate corruption case records into dashboard metrics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a JSON file of case records
    Summary {
        /// JSON array of case rows
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        aggregate: AggregateArgs,
    },
    /// Aggregate the case table of the hosted backend
    Fetch {
        #[command(flatten)]
        aggregate: AggregateArgs,
    },
    /// Print the derived severity breakdown of each case
    Score {
        /// JSON array of case rows
        #[arg(long)]
        input: PathBuf,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List the distinct values of a case field
    Values {
        /// JSON array of case rows
        #[arg(long)]
        input: PathBuf,
        /// Field to inspect (case_status, government_level, sector,
        /// corruption_type, regions_affected)
        #[arg(long)]
        field: CaseField,
    },
    /// Feed change events through the live reducer and print the result
    Replay {
        /// JSON array of `{ "kind": ..., "record": ... }` events
        #[arg(long)]
        events: PathBuf,
        /// JSON array of case rows present before the first event
        #[arg(long)]
        initial: Option<PathBuf>,
        /// Reference instant (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Args)]
struct AggregateArgs {
    /// Timestamp used for time-series buckets
    #[arg(long, default_value = "published_date")]
    date_field: DateField,
    /// Time-series bucket width (day, week, month, year)
    #[arg(long, default_value = "month")]
    granularity: TimeGranularity,
    /// Reference instant (RFC 3339 or YYYY-MM-DD); defaults to now
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,
    /// Score cases without a precomputed severity before aggregating
    #[arg(long)]
    derive_severity: bool,
    /// Only aggregate cases with one of these statuses (repeatable)
    #[arg(long = "status")]
    statuses: Vec<String>,
    /// Drop the cases matching `--status` instead of keeping them
    #[arg(long, requires = "statuses")]
    exclude_status: bool,
    /// Print a readable summary instead of JSON
    #[arg(long)]
    text: bool,
    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl AggregateArgs {
    fn options(&self) -> AggregateOptions {
        AggregateOptions {
            date_field: self.date_field,
            granularity: self.granularity,
            severity: if self.derive_severity {
                SeverityPolicy::DeriveMissing
            } else {
                SeverityPolicy::PresentOnly
            },
        }
    }

    fn select(&self, cases: Vec<CaseRecord>) -> Vec<CaseRecord> {
        if self.statuses.is_empty() {
            return cases;
        }
        let statuses: Vec<&str> = self.statuses.iter().map(String::as_str).collect();
        filter_cases_by_status(&cases, &statuses, self.exclude_status)
    }
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(s).ok_or_else(|| format!("'{s}' is not an RFC 3339 timestamp or YYYY-MM-DD date"))
}

fn clock_for(now: Option<DateTime<Utc>>) -> Arc<dyn Clock> {
    match now {
        Some(now) => Arc::new(FixedClock(now)),
        None => Arc::new(SystemClock),
    }
}

fn print_json<T: serde::Serialize>(
    value: &T,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

async fn summarize(
    store: &dyn CaseStore,
    args: &AggregateArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let cases = args.select(store.fetch_all().await?);
    let now = clock_for(args.now).now();
    let report = aggregate_with(&cases, now, &args.options());

    if args.text {
        print!("{}", report::render(&report));
        Ok(())
    } else {
        print_json(&report, args.pretty)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { input, aggregate } => {
            summarize(&JsonFileStore::new(input), &aggregate).await?;
        }
        Commands::Fetch { aggregate } => {
            let store = RestStore::new(StoreConfig::from_env()?)?;
            summarize(&store, &aggregate).await?;
        }
        Commands::Score { input, pretty } => {
            let cases = JsonFileStore::new(input).fetch_all().await?;
            print_json(&report::scores(&cases), pretty)?;
        }
        Commands::Values { input, field } => {
            let cases = JsonFileStore::new(input).fetch_all().await?;
            for value in unique_field_values(&cases, field) {
                println!("{value}");
            }
        }
        Commands::Replay {
            events,
            initial,
            now,
            pretty,
        } => {
            let outcome = report::replay(&events, initial.as_deref(), clock_for(now)).await?;
            print_json(&outcome, pretty)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_instants() {
        assert_eq!(
            parse_now("2025-03-01").unwrap().to_rfc3339(),
            "2025-03-01T00:00:00+00:00"
        );
        assert!(parse_now("yesterday").is_err());
    }

    #[test]
    fn cli_parses_summary_flags() {
        let cli = Cli::try_parse_from([
            "corruption_watch",
            "summary",
            "--input",
            "cases.json",
            "--granularity",
            "week",
            "--date-field",
            "created_at",
            "--status",
            "closed",
            "--exclude-status",
            "--derive-severity",
        ])
        .unwrap();

        let Commands::Summary { input, aggregate } = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(input, PathBuf::from("cases.json"));
        let options = aggregate.options();
        assert_eq!(options.granularity, TimeGranularity::Weekly);
        assert_eq!(options.date_field, DateField::CreatedAt);
        assert_eq!(options.severity, SeverityPolicy::DeriveMissing);
        assert!(aggregate.exclude_status);
    }

    #[test]
    fn status_selection_filters_cases() {
        let cli = Cli::try_parse_from([
            "corruption_watch",
            "fetch",
            "--status",
            "closed",
        ])
        .unwrap();
        let Commands::Fetch { aggregate } = cli.command else {
            panic!("expected fetch");
        };

        let mut open = CaseRecord::new("a");
        open.case_status = Some("trial".to_string());
        let mut closed = CaseRecord::new("b");
        closed.case_status = Some("Closed".to_string());

        let kept = aggregate.select(vec![open, closed]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "b");
    }

    #[test]
    fn cli_parses_field_names() {
        let cli = Cli::try_parse_from([
            "corruption_watch",
            "values",
            "--input",
            "cases.json",
            "--field",
            "regions_affected",
        ])
        .unwrap();
        let Commands::Values { field, .. } = cli.command else {
            panic!("expected values");
        };
        assert_eq!(field, CaseField::RegionsAffected);

        assert!(
            Cli::try_parse_from([
                "corruption_watch",
                "fetch",
                "--date-field",
                "signed_at",
            ])
            .is_err()
        );
    }
}
