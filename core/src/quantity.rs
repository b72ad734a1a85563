//! Free-text quantity handling.
//!
//! Quantities are stored as strings ("3", "2.5", "1,5 kg", "a dozen"). Only the
//! first number in the text is meaningful; everything else is tolerated and ignored.

use std::sync::LazyLock;

use regex::Regex;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?(?:\d+(?:\.\d+)?|\.\d+)").expect("valid quantity regex"));

/// Extract the first decimal number from `raw`, or 0 when there is none.
///
/// Commas are read as decimal separators, so "1,5" parses as 1.5.
#[must_use]
pub fn parse_quantity(raw: &str) -> f64 {
    let normalized = raw.replace(',', ".");
    NUMBER
        .find(&normalized)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Canonical text form written back to storage: two decimals at most, no
/// trailing ".0" on whole numbers.
#[must_use]
pub fn format_quantity(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    // Adding 0.0 folds -0.0 into 0.0.
    let mut rounded = (n * 100.0).round() / 100.0 + 0.0;
    // Scaling overflows for huge values; those have no fractional part anyway.
    if !rounded.is_finite() {
        rounded = n;
    }
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

/// Recipe "need" quantity: absent or non-positive means 1.
#[must_use]
pub fn need_quantity(quantity: Option<f64>) -> f64 {
    quantity.filter(|q| q.is_finite() && *q > 0.0).unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_numbers() {
        assert_eq!(parse_quantity("3"), 3.0);
        assert_eq!(parse_quantity("2.50"), 2.5);
        assert_eq!(parse_quantity("  12 "), 12.0);
    }

    #[test]
    fn test_parse_comma_decimal() {
        assert_eq!(parse_quantity("1,5"), 1.5);
        assert_eq!(parse_quantity("1,5 kg"), 1.5);
    }

    #[test]
    fn test_parse_ignores_suffix_and_prefix_text() {
        assert_eq!(parse_quantity("3 eggs"), 3.0);
        assert_eq!(parse_quantity("about 200g"), 200.0);
        assert_eq!(parse_quantity(".5 cup"), 0.5);
    }

    #[test]
    fn test_parse_signed() {
        assert_eq!(parse_quantity("-2"), -2.0);
    }

    #[test]
    fn test_parse_non_numeric_is_zero() {
        assert_eq!(parse_quantity(""), 0.0);
        assert_eq!(parse_quantity("a dozen"), 0.0);
    }

    #[test]
    fn test_format_integers_without_decimal() {
        assert_eq!(format_quantity(3.0), "3");
        assert_eq!(format_quantity(0.0), "0");
        assert_eq!(format_quantity(-0.0), "0");
    }

    #[test]
    fn test_format_rounds_to_two_places() {
        assert_eq!(format_quantity(2.5), "2.5");
        assert_eq!(format_quantity(1.234), "1.23");
        assert_eq!(format_quantity(0.1 + 0.2), "0.3");
        assert_eq!(format_quantity(1.999), "2");
    }

    #[test]
    fn test_format_non_finite() {
        assert_eq!(format_quantity(f64::NAN), "0");
        assert_eq!(format_quantity(f64::INFINITY), "0");
    }

    #[test]
    fn test_format_huge_finite_values() {
        let text = format_quantity(1e307);
        assert_ne!(text, "inf");
        assert_eq!(parse_quantity(&text), 1e307);
        assert_eq!(format_quantity(f64::MAX), format!("{:.0}", f64::MAX));
        assert_eq!(format_quantity(-1e307), format!("{:.0}", -1e307));
    }

    #[test]
    fn test_format_parse_idempotent_on_canonical_strings() {
        assert_eq!(format_quantity(parse_quantity("3")), "3");
        assert_eq!(format_quantity(parse_quantity("2.50")), "2.5");
        for s in ["0", "1", "0.25", "10.5", "99.99"] {
            let once = format_quantity(parse_quantity(s));
            assert_eq!(format_quantity(parse_quantity(&once)), once);
        }
    }

    #[test]
    fn test_need_quantity_defaults() {
        assert_eq!(need_quantity(None), 1.0);
        assert_eq!(need_quantity(Some(0.0)), 1.0);
        assert_eq!(need_quantity(Some(-3.0)), 1.0);
        assert_eq!(need_quantity(Some(2.5)), 2.5);
    }
}
