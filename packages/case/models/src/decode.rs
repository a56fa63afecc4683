//! Lenient field decoders for rows coming from the hosted backend.
//!
//! The backend hands back loosely typed JSON: ids may be numbers or
//! strings, money columns are `numeric` and can arrive as floats or
//! strings, and date columns may be full timestamps or bare dates. These
//! decoders accept every shape seen in practice and normalize invalid
//! values to "absent" instead of failing the whole row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Upper bound for the severity score.
pub const MAX_SEVERITY: f64 = 10.0;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Unsigned(v) => *v as f64,
            Self::Signed(v) => *v as f64,
            Self::Float(v) => *v,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Parses a timestamp in RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]`,
/// naive `YYYY-MM-DD HH:MM:SS`, or date-only form. Naive values are taken
/// as UTC and bare dates as midnight UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Decodes an id that may be a string or an integer. `null` becomes an
/// empty id, which marks the record as malformed.
///
/// # Errors
///
/// Returns the deserializer's error if the value is neither a string, an
/// integer, nor `null`.
pub fn case_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(s)) => s,
        Some(RawId::Unsigned(v)) => v.to_string(),
        Some(RawId::Signed(v)) => v.to_string(),
        None => String::new(),
    })
}

/// Decodes a nullable string into an owned string, `null` becoming empty.
///
/// # Errors
///
/// Returns the deserializer's error if the value is not a string or `null`.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes an optional timestamp string. Unparseable values are absent.
///
/// # Errors
///
/// Returns the deserializer's error if the value is not a string or `null`.
pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .as_deref()
        .and_then(parse_timestamp))
}

/// Decodes an optional monetary amount. Negative values clamp to zero,
/// fractional values round to the nearest unit, and non-numeric values
/// are absent.
///
/// # Errors
///
/// Returns the deserializer's error if the value is not a number, a
/// string, or `null`.
pub fn amount<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<RawNumber>::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(match raw {
        RawNumber::Unsigned(v) => Some(v),
        RawNumber::Signed(v) => Some(u64::try_from(v).unwrap_or(0)),
        other => other.as_f64().map(amount_from_f64),
    })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn amount_from_f64(value: f64) -> u64 {
    if value <= 0.0 {
        0
    } else if value >= u64::MAX as f64 {
        u64::MAX
    } else {
        value.round() as u64
    }
}

/// Decodes an optional severity score, clamped to `[0, 10]`.
///
/// # Errors
///
/// Returns the deserializer's error if the value is not a number, a
/// string, or `null`.
pub fn severity<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawNumber>::deserialize(deserializer)?
        .and_then(|raw| raw.as_f64())
        .map(|v| v.clamp(0.0, MAX_SEVERITY)))
}

/// Decodes a nullable list of labels, `null` becoming an empty list.
///
/// # Errors
///
/// Returns the deserializer's error if the value is not an array of
/// strings or `null`.
pub fn labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CaseRecord;

    #[test]
    fn parses_every_timestamp_shape() {
        let expected = "2024-02-29T00:00:00+00:00";
        for input in [
            "2024-02-29",
            "2024-02-29T00:00:00",
            "2024-02-29 00:00:00",
            "2024-02-29T07:00:00+07:00",
            "2024-02-29T00:00:00.000Z",
        ] {
            let parsed = parse_timestamp(input).unwrap();
            assert_eq!(parsed.to_rfc3339(), expected, "input {input}");
        }
        assert_eq!(parse_timestamp("last tuesday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn clamps_amounts_and_severity() {
        let record: CaseRecord = serde_json::from_value(serde_json::json!({
            "id": "x",
            "estimated_losses_idr": -5,
            "asset_recovery_idr": "1250000.6",
            "corruption_severity_score": 14.2,
        }))
        .unwrap();

        assert_eq!(record.estimated_losses, Some(0));
        assert_eq!(record.asset_recovery, Some(1_250_001));
        assert_eq!(record.severity_score, Some(10.0));
    }

    #[test]
    fn unparseable_values_are_absent() {
        let record: CaseRecord = serde_json::from_value(serde_json::json!({
            "id": "x",
            "estimated_losses_idr": "unknown",
            "corruption_severity_score": "n/a",
            "published_date": "sometime in 2019",
        }))
        .unwrap();

        assert_eq!(record.estimated_losses, None);
        assert_eq!(record.severity_score, None);
        assert_eq!(record.published_date, None);
    }
}
