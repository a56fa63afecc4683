//! Derived 0-10 severity score for a single case.
//!
//! The score is a weighted sum of four sub-scores, each on a 0-10 scale.
//! A missing input contributes zero to its term; scoring never fails.

use corruption_watch_case_models::{CaseRecord, CorruptionKind};
use serde::{Deserialize, Serialize};

/// Maximum severity score.
pub const MAX_SCORE: f64 = 10.0;

/// Losses below this amount contribute nothing to the losses sub-score.
const LOSSES_BASELINE: f64 = 1_000_000.0;

/// Weights applied to each sub-score. They sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityWeights {
    /// Weight of the estimated-losses sub-score.
    pub losses: f64,
    /// Weight of the government-level sub-score.
    pub government_level: f64,
    /// Weight of the corruption-type sub-score.
    pub corruption_type: f64,
    /// Weight of the case-status sub-score.
    pub case_status: f64,
}

/// The fixed weighting used by the dashboard.
pub const WEIGHTS: SeverityWeights = SeverityWeights {
    losses: 0.4,
    government_level: 0.3,
    corruption_type: 0.2,
    case_status: 0.1,
};

/// Unweighted sub-scores of one case together with the final score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityBreakdown {
    /// `log10(losses / 1M) * 2`, clamped to `[0, 10]`.
    pub losses: f64,
    /// Government-level table value.
    pub government_level: f64,
    /// Highest corruption-type table value across the case's labels.
    pub corruption_type: f64,
    /// Case-stage table value.
    pub case_status: f64,
    /// Weighted sum, clamped to `[0, 10]`.
    pub total: f64,
}

/// Losses sub-score on a 0-10 scale: two points per order of magnitude
/// above one million.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn losses_subscore(estimated_losses: Option<u64>) -> f64 {
    if let Some(losses) = estimated_losses
        && losses > 0
    {
        ((losses as f64 / LOSSES_BASELINE).log10() * 2.0).clamp(0.0, MAX_SCORE)
    } else {
        0.0
    }
}

/// Corruption-type sub-score: the maximum table value across all labels,
/// unknown labels scoring [`CorruptionKind::UNKNOWN_SEVERITY`], zero for
/// an empty list.
#[must_use]
pub fn corruption_type_subscore(labels: &[String]) -> f64 {
    labels
        .iter()
        .map(|label| CorruptionKind::label_severity(label))
        .max()
        .map_or(0.0, f64::from)
}

/// Computes every sub-score of `case` and the weighted total.
#[must_use]
pub fn breakdown(case: &CaseRecord) -> SeverityBreakdown {
    let losses = losses_subscore(case.estimated_losses);
    let government_level = case
        .government_level()
        .map_or(0.0, |level| f64::from(level.severity()));
    let corruption_type = corruption_type_subscore(&case.corruption_type);
    let case_status = case
        .case_stage()
        .map_or(0.0, |stage| f64::from(stage.severity()));

    let total = WEIGHTS.case_status.mul_add(
        case_status,
        WEIGHTS.corruption_type.mul_add(
            corruption_type,
            WEIGHTS
                .government_level
                .mul_add(government_level, WEIGHTS.losses * losses),
        ),
    );

    SeverityBreakdown {
        losses,
        government_level,
        corruption_type,
        case_status,
        total: total.clamp(0.0, MAX_SCORE),
    }
}

/// Returns the derived severity of `case`, always within `[0, 10]`.
#[must_use]
pub fn score(case: &CaseRecord) -> f64 {
    breakdown(case).total
}

/// Returns the precomputed severity if present, otherwise the derived one.
#[must_use]
pub fn effective_score(case: &CaseRecord) -> f64 {
    case.severity_score.unwrap_or_else(|| score(case))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn case() -> CaseRecord {
        CaseRecord::new("case-1")
    }

    #[test]
    fn empty_case_scores_zero() {
        assert!(score(&case()).abs() < TOLERANCE);
    }

    #[test]
    fn weights_sum_to_one() {
        let sum = WEIGHTS.losses + WEIGHTS.government_level + WEIGHTS.corruption_type
            + WEIGHTS.case_status;
        assert!((sum - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn national_conviction_for_bribery_and_embezzlement() {
        let mut c = case();
        c.corruption_type = vec!["bribery".to_string(), "embezzlement".to_string()];
        c.government_level = Some("national".to_string());
        c.case_status = Some("convicted".to_string());
        c.estimated_losses = Some(1_000_000_000);

        let b = breakdown(&c);

        assert!((b.losses - 6.0).abs() < TOLERANCE);
        assert!((b.corruption_type - 9.0).abs() < TOLERANCE);
        assert!((b.total - 8.2).abs() < TOLERANCE, "got {}", b.total);
    }

    #[test]
    fn losses_subscore_is_clamped() {
        assert!(losses_subscore(None).abs() < TOLERANCE);
        assert!(losses_subscore(Some(0)).abs() < TOLERANCE);
        assert!(losses_subscore(Some(500)).abs() < TOLERANCE);
        assert!((losses_subscore(Some(10_000_000)) - 2.0).abs() < TOLERANCE);
        assert!((losses_subscore(Some(u64::MAX)) - MAX_SCORE).abs() < TOLERANCE);
    }

    #[test]
    fn unknown_labels_contribute_what_the_tables_say() {
        let mut c = case();
        c.corruption_type = vec!["money laundering".to_string()];
        c.government_level = Some("federal".to_string());
        c.case_status = Some("appeal".to_string());

        let b = breakdown(&c);

        assert!((b.corruption_type - 5.0).abs() < TOLERANCE);
        assert!(b.government_level.abs() < TOLERANCE);
        assert!(b.case_status.abs() < TOLERANCE);
        assert!((b.total - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn score_never_leaves_range() {
        let levels = [None, Some("village"), Some("national")];
        let statuses = [None, Some("dismissed"), Some("convicted")];
        let losses = [None, Some(1), Some(999_999), Some(1_000_000_000_000_000)];

        for level in levels {
            for status in statuses {
                for amount in losses {
                    let mut c = case();
                    c.government_level = level.map(str::to_string);
                    c.case_status = status.map(str::to_string);
                    c.estimated_losses = amount;
                    c.corruption_type = vec!["embezzlement".to_string()];
                    let s = score(&c);
                    assert!((0.0..=MAX_SCORE).contains(&s), "{s} out of range");
                }
            }
        }
    }

    #[test]
    fn effective_score_prefers_precomputed() {
        let mut c = case();
        c.government_level = Some("national".to_string());
        assert!((effective_score(&c) - 3.0).abs() < TOLERANCE);
        c.severity_score = Some(9.5);
        assert!((effective_score(&c) - 9.5).abs() < TOLERANCE);
    }
}
