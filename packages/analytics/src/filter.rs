//! Case-list filtering helpers used by the searchable case table.

use std::collections::BTreeSet;

use corruption_watch_case_models::CaseRecord;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Status label assumed for cases without one.
const UNKNOWN_STATUS: &str = "unknown";

/// Text or list fields whose distinct values can be enumerated.
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
pub enum CaseField {
    /// `case_status`
    CaseStatus,
    /// `government_level`
    GovernmentLevel,
    /// `sector`
    Sector,
    /// `corruption_type` (each label)
    CorruptionType,
    /// `regions_affected` (each label)
    RegionsAffected,
}

/// Keeps cases whose status (lowercased, `unknown` when absent) is one of
/// `statuses`, or drops them when `exclude` is set.
#[must_use]
pub fn filter_cases_by_status(
    cases: &[CaseRecord],
    statuses: &[&str],
    exclude: bool,
) -> Vec<CaseRecord> {
    let wanted: BTreeSet<String> = statuses.iter().map(|s| s.to_lowercase()).collect();

    cases
        .iter()
        .filter(|case| {
            let status = case
                .case_status
                .as_deref()
                .map_or_else(|| UNKNOWN_STATUS.to_string(), str::to_lowercase);
            wanted.contains(&status) != exclude
        })
        .cloned()
        .collect()
}

/// Returns the sorted distinct values of `field` across `cases`. List
/// fields contribute each of their labels.
#[must_use]
pub fn unique_field_values(cases: &[CaseRecord], field: CaseField) -> Vec<String> {
    let mut values = BTreeSet::new();

    for case in cases {
        match field {
            CaseField::CaseStatus => values.extend(case.case_status.iter().cloned()),
            CaseField::GovernmentLevel => values.extend(case.government_level.iter().cloned()),
            CaseField::Sector => values.extend(case.sector.iter().cloned()),
            CaseField::CorruptionType => values.extend(case.corruption_type.iter().cloned()),
            CaseField::RegionsAffected => values.extend(case.regions_affected.iter().cloned()),
        }
    }

    values.into_iter().collect()
}
