use lazy_static::lazy_static;
use regex::Regex;

use crate::{DwhExportError, Result};

lazy_static! {
    /// A signed integer followed by an optional unit, e.g. `30s`, `5M` or `60000`.
    static ref DURATION_PATTERN: Regex = Regex::new(r"^([+-]?\d+)([a-zA-Z]{0,2})$").unwrap();
}

const UNITS: [(i64, &str); 5] = [
    (86_400_000, "d"),
    (3_600_000, "h"),
    (60_000, "m"),
    (1_000, "s"),
    (1, "ms"),
];

/// Parses a duration such as `30s`, `5m`, `2H` or `1d` into milliseconds.
///
/// Units are case-insensitive (`ns`, `us`, `ms`, `s`, `m`, `h`, `d`) and a bare
/// number is taken as milliseconds. Sub-millisecond values truncate toward zero.
pub fn parse_millis(value: &str) -> Result<i64> {
    let invalid = |reason: &str| DwhExportError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let caps = DURATION_PATTERN
        .captures(value.trim())
        .ok_or_else(|| invalid("expected a number with an optional unit"))?;
    let amount: i64 = caps[1].parse().map_err(|_| invalid("number is out of range"))?;

    let millis = match caps[2].to_ascii_lowercase().as_str() {
        "ns" => Some(amount / 1_000_000),
        "us" => Some(amount / 1_000),
        "" | "ms" => Some(amount),
        "s" => amount.checked_mul(1_000),
        "m" => amount.checked_mul(60_000),
        "h" => amount.checked_mul(3_600_000),
        "d" => amount.checked_mul(86_400_000),
        _ => return Err(invalid("unknown time unit")),
    };
    millis.ok_or_else(|| invalid("duration is too large"))
}

/// Formats milliseconds in the largest unit that represents them exactly,
/// so that the result is a valid InfluxQL duration literal.
pub fn format_millis(millis: i64) -> String {
    if millis == 0 {
        return "0ms".to_string();
    }
    let (factor, unit) = UNITS
        .iter()
        .find(|(factor, _)| millis % factor == 0)
        .copied()
        .unwrap_or((1, "ms"));
    format!("{}{}", millis / factor, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_millis("500ms").unwrap(), 500);
        assert_eq!(parse_millis("30s").unwrap(), 30_000);
        assert_eq!(parse_millis("5m").unwrap(), 300_000);
        assert_eq!(parse_millis("2h").unwrap(), 7_200_000);
        assert_eq!(parse_millis("1d").unwrap(), 86_400_000);
    }

    #[test]
    fn test_parse_units_are_case_insensitive() {
        // M is minutes, not months
        assert_eq!(parse_millis("5M").unwrap(), 300_000);
        assert_eq!(parse_millis("1H").unwrap(), 3_600_000);
        assert_eq!(parse_millis("30S").unwrap(), 30_000);
        assert_eq!(parse_millis("250MS").unwrap(), 250);
    }

    #[test]
    fn test_parse_bare_number_is_millis() {
        assert_eq!(parse_millis("60000").unwrap(), 60_000);
        assert_eq!(parse_millis("+15").unwrap(), 15);
        assert_eq!(parse_millis("-60000").unwrap(), -60_000);
    }

    #[test]
    fn test_parse_sub_millisecond_units() {
        assert_eq!(parse_millis("2500us").unwrap(), 2);
        assert_eq!(parse_millis("3000000ns").unwrap(), 3);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for value in ["soon", "", "1 m", "1.5s", "5w", "1h30m", "s"] {
            assert!(
                matches!(parse_millis(value), Err(DwhExportError::InvalidDuration { .. })),
                "accepted {:?}",
                value
            );
        }
        assert!(parse_millis("9223372036854775807d").is_err());
    }

    #[test]
    fn test_format_uses_largest_exact_unit() {
        assert_eq!(format_millis(1_000), "1s");
        assert_eq!(format_millis(60_000), "1m");
        assert_eq!(format_millis(90_000), "90s");
        assert_eq!(format_millis(5_400_000), "90m");
        assert_eq!(format_millis(86_400_000), "1d");
        assert_eq!(format_millis(1_500), "1500ms");
        assert_eq!(format_millis(0), "0ms");
    }
}
