#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Corruption case record types and label taxonomies.
//!
//! [`CaseRecord`] is the normalized shape of one tracked case as consumed
//! by aggregation. Rows coming from the hosted backend use snake_case
//! column names with an `_idr` currency suffix; both spellings decode into
//! the same record. Free-text labels (government level, case status,
//! corruption type) stay as text on the record and are classified into
//! the fixed taxonomies below on demand.

pub mod decode;

use chrono::{DateTime, Datelike as _, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Level of government at which a case took place.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GovernmentLevel {
    /// Central government ministries and agencies
    National,
    /// Provincial administrations
    Provincial,
    /// Regency (kabupaten) administrations
    Regency,
    /// City (kota) administrations
    City,
    /// District (kecamatan) offices
    District,
    /// Village (desa) administrations
    Village,
}

impl GovernmentLevel {
    /// Parses a free-text label, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        label.trim().parse().ok()
    }

    /// Returns the 0-10 severity sub-score for this level.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::National => 10,
            Self::Provincial => 8,
            Self::Regency | Self::City => 6,
            Self::District => 4,
            Self::Village => 2,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::National,
            Self::Provincial,
            Self::Regency,
            Self::City,
            Self::District,
            Self::Village,
        ]
    }
}

/// Procedural stage of a case, as used for severity scoring.
///
/// This is distinct from [`StatusClass`]: the stage table only knows a
/// handful of exact labels, while the class is a substring heuristic that
/// partitions every record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CaseStage {
    /// A court has convicted at least one defendant
    Convicted,
    /// The case is before a court
    Trial,
    /// Law enforcement is investigating
    Investigation,
    /// Reported but not yet acted on
    Reported,
    /// Dropped or dismissed
    Dismissed,
}

impl CaseStage {
    /// Parses a free-text status label, ignoring case and surrounding
    /// whitespace. Only exact stage names match.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        label.trim().parse().ok()
    }

    /// Returns the 0-10 severity sub-score for this stage.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Convicted => 10,
            Self::Trial => 8,
            Self::Investigation => 6,
            Self::Reported => 4,
            Self::Dismissed => 2,
        }
    }
}

/// Known corruption categories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CorruptionKind {
    /// Misappropriation of entrusted public funds
    Embezzlement,
    /// Giving or receiving something of value to influence an official act
    Bribery,
    /// Obtaining value through coercion by an official
    Extortion,
    /// Deception for financial gain (procurement fraud, fake invoices)
    Fraud,
    /// Using office for purposes outside its mandate
    AbuseOfPower,
    /// Favoring relatives in appointments or contracts
    Nepotism,
    /// Undisclosed private interest in an official decision
    ConflictOfInterest,
}

impl CorruptionKind {
    /// Severity sub-score used for labels outside the known taxonomy.
    pub const UNKNOWN_SEVERITY: u8 = 5;

    /// Parses a free-text label. Case is ignored and spaces or hyphens are
    /// treated as underscores, so `"Abuse of Power"` matches
    /// [`Self::AbuseOfPower`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        normalized.parse().ok()
    }

    /// Returns the 0-10 severity sub-score for this kind.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Embezzlement => 9,
            Self::Bribery | Self::Extortion => 8,
            Self::Fraud => 7,
            Self::AbuseOfPower => 6,
            Self::Nepotism => 5,
            Self::ConflictOfInterest => 4,
        }
    }

    /// Severity sub-score for an arbitrary label, falling back to
    /// [`Self::UNKNOWN_SEVERITY`] for labels outside the taxonomy.
    #[must_use]
    pub fn label_severity(label: &str) -> u8 {
        Self::from_label(label).map_or(Self::UNKNOWN_SEVERITY, Self::severity)
    }
}

/// Coarse lifecycle class used for the pending/ongoing/closed counters.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusClass {
    /// Awaiting action or under investigation
    Pending,
    /// Anything that is neither pending nor closed, including no status
    Ongoing,
    /// Closed or completed
    Closed,
}

impl StatusClass {
    /// Classifies a free-text status by substring match.
    ///
    /// `"pending"`/`"investigation"` win over `"closed"`/`"completed"`
    /// so that every status lands in exactly one class.
    #[must_use]
    pub fn classify(status: Option<&str>) -> Self {
        let Some(status) = status else {
            return Self::Ongoing;
        };
        let status = status.to_lowercase();

        if status.contains("pending") || status.contains("investigation") {
            Self::Pending
        } else if status.contains("closed") || status.contains("completed") {
            Self::Closed
        } else {
            Self::Ongoing
        }
    }
}

/// Which timestamp of a case drives time bucketing.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DateField {
    /// When the source article was published.
    #[default]
    PublishedDate,
    /// When the underlying incident began.
    IncidentStartDate,
    /// When the record was created in the store.
    CreatedAt,
    /// When a verdict was handed down.
    VerdictDate,
}

/// One tracked corruption case.
///
/// Every field other than `id` may be absent. Amounts are in the smallest
/// currency unit (Rupiah) and are never negative; `severity_score` is
/// always within `[0, 10]`. The decoders in [`decode`] enforce both on
/// the way in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    /// Opaque unique identifier. Empty when the source row had none.
    #[serde(default, deserialize_with = "decode::case_id")]
    pub id: String,
    /// Headline of the case.
    #[serde(default, deserialize_with = "decode::text")]
    pub title: String,
    /// Short summary text.
    #[serde(default)]
    pub excerpt: Option<String>,
    /// When the record was created in the store.
    #[serde(default, alias = "created_at", deserialize_with = "decode::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the source article was published.
    #[serde(
        default,
        alias = "published_date",
        deserialize_with = "decode::timestamp"
    )]
    pub published_date: Option<DateTime<Utc>>,
    /// When the underlying incident began.
    #[serde(
        default,
        alias = "incident_start_date",
        deserialize_with = "decode::timestamp"
    )]
    pub incident_start_date: Option<DateTime<Utc>>,
    /// When a verdict was handed down.
    #[serde(default, alias = "verdict_date", deserialize_with = "decode::timestamp")]
    pub verdict_date: Option<DateTime<Utc>>,
    /// Estimated state losses.
    #[serde(
        default,
        alias = "estimated_losses_idr",
        deserialize_with = "decode::amount"
    )]
    pub estimated_losses: Option<u64>,
    /// Assets recovered so far.
    #[serde(
        default,
        alias = "asset_recovery_idr",
        deserialize_with = "decode::amount"
    )]
    pub asset_recovery: Option<u64>,
    /// Precomputed severity in `[0, 10]`.
    #[serde(
        default,
        alias = "corruption_severity_score",
        deserialize_with = "decode::severity"
    )]
    pub severity_score: Option<f64>,
    /// Free-text status (e.g. "investigation", "closed").
    #[serde(default, alias = "case_status")]
    pub case_status: Option<String>,
    /// Free-text government level (see [`GovernmentLevel`]).
    #[serde(default, alias = "government_level")]
    pub government_level: Option<String>,
    /// Corruption category labels, in source order.
    #[serde(default, alias = "corruption_type", deserialize_with = "decode::labels")]
    pub corruption_type: Vec<String>,
    /// Free-text sector label.
    #[serde(default)]
    pub sector: Option<String>,
    /// Affected region labels, in source order.
    #[serde(
        default,
        alias = "regions_affected",
        deserialize_with = "decode::labels"
    )]
    pub regions_affected: Vec<String>,
}

impl CaseRecord {
    /// Creates an otherwise empty record with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if this record carries a usable identifier.
    ///
    /// Records without one are skipped by aggregation and by the live
    /// reducer's keyed case set.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Returns the pending/ongoing/closed class of this case.
    #[must_use]
    pub fn status_class(&self) -> StatusClass {
        StatusClass::classify(self.case_status.as_deref())
    }

    /// Returns the parsed government level, if known.
    #[must_use]
    pub fn government_level(&self) -> Option<GovernmentLevel> {
        self.government_level
            .as_deref()
            .and_then(GovernmentLevel::from_label)
    }

    /// Returns the parsed procedural stage, if the status is an exact
    /// stage name.
    #[must_use]
    pub fn case_stage(&self) -> Option<CaseStage> {
        self.case_status.as_deref().and_then(CaseStage::from_label)
    }

    /// Returns the timestamp selected by `field`.
    #[must_use]
    pub const fn date(&self, field: DateField) -> Option<DateTime<Utc>> {
        match field {
            DateField::PublishedDate => self.published_date,
            DateField::IncidentStartDate => self.incident_start_date,
            DateField::CreatedAt => self.created_at,
            DateField::VerdictDate => self.verdict_date,
        }
    }

    /// Returns `true` if the record was created in the given calendar
    /// month (UTC).
    #[must_use]
    pub fn created_in_month(&self, year: i32, month: u32) -> bool {
        self.created_at
            .is_some_and(|created| created.year() == year && created.month() == month)
    }
}
