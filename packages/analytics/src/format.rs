//! Indonesian Rupiah formatting for metric cards and tooltips.

/// Compact suffixes, largest first: triliun, miliar, juta.
const COMPACT_UNITS: [(u64, &str); 3] = [
    (1_000_000_000_000, "T"),
    (1_000_000_000, "M"),
    (1_000_000, "jt"),
];

/// Groups the digits of `value` in threes with `.` separators.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Formats an amount in Rupiah.
///
/// Full form groups thousands with dots (`Rp 1.500.000`). With `compact`
/// set, amounts of one million or more use one fractional digit and an
/// Indonesian magnitude suffix (`Rp 1,5 jt`, `Rp 2 M`, `Rp 3,2 T`).
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn format_idr(amount: u64, compact: bool) -> String {
    if compact {
        for (unit, suffix) in COMPACT_UNITS {
            if amount >= unit {
                let tenths = (amount as f64 / unit as f64 * 10.0).round() as u64;
                let whole = group_thousands(tenths / 10);
                return match tenths % 10 {
                    0 => format!("Rp {whole} {suffix}"),
                    frac => format!("Rp {whole},{frac} {suffix}"),
                };
            }
        }
    }
    format!("Rp {}", group_thousands(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_form_groups_thousands() {
        assert_eq!(format_idr(0, false), "Rp 0");
        assert_eq!(format_idr(999, false), "Rp 999");
        assert_eq!(format_idr(1_500_000, false), "Rp 1.500.000");
        assert_eq!(format_idr(12_345_678_901, false), "Rp 12.345.678.901");
    }

    #[test]
    fn compact_form_uses_indonesian_suffixes() {
        assert_eq!(format_idr(1_500_000, true), "Rp 1,5 jt");
        assert_eq!(format_idr(2_000_000_000, true), "Rp 2 M");
        assert_eq!(format_idr(3_240_000_000_000, true), "Rp 3,2 T");
        assert_eq!(format_idr(1_250_000_000_000_000, true), "Rp 1.250 T");
        assert_eq!(format_idr(950_000, true), "Rp 950.000");
    }
}
