//! Fixed-point parsing of decimal flow-rate strings.
//!
//! Flow rates arrive as decimal text (`"12.345"`, `"7"`, `"3.1"`) and are
//! converted to an exact integer scaled by 10^6 (micro-units per hour), so
//! the accumulation path never touches floating point.
//!
//! # Precision
//!
//! | Fractional digits | Handling                          |
//! |-------------------|-----------------------------------|
//! | fewer than 6      | right-padded with zeros           |
//! | exactly 6         | used as-is                        |
//! | more than 6       | truncated to 6 (precision overflow) |
//!
//! Truncation is reported on the [`ParsedRate`] rather than as an error, so
//! the sample is still integrated.
//!
//! # Example
//!
//! ```
//! use fuelwatch::rate::{format_micro, parse_rate};
//!
//! let rate = parse_rate("12.345").unwrap();
//! assert_eq!(rate.micro_units, 12_345_000);
//! assert_eq!(format_micro(rate.micro_units), "12.345000");
//! ```

use thiserror::Error;

/// Scale factor between whole units and micro-units.
pub const MICRO_SCALE: u64 = 1_000_000;

/// Number of fractional decimal digits kept by the parser.
pub const FRACTION_DIGITS: usize = 6;

/// Errors produced while parsing a flow-rate string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// The input has no parseable numeric prefix.
    #[error("Malformed sample: no numeric value in '{0}'")]
    MalformedSample(String),

    /// The value does not fit in 64-bit micro-units.
    #[error("Flow rate out of range: {0}")]
    OutOfRange(String),
}

/// A flow rate parsed into micro-units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRate {
    /// Value scaled by 10^6.
    pub micro_units: u64,
    /// Fractional digits dropped beyond the sixth.
    pub truncated_digits: usize,
}

impl ParsedRate {
    /// Whether the input carried more fractional digits than are kept.
    pub fn precision_overflow(&self) -> bool {
        self.truncated_digits > 0
    }
}

/// Parse a decimal flow-rate string into micro-units.
///
/// Leading whitespace is skipped. The numeric prefix is a run of digits with
/// at most one decimal point; anything after it is discarded. Digits are
/// always read base-10, so `"010.5"` is ten and a half.
///
/// # Errors
///
/// [`RateError::MalformedSample`] if no digit appears in the numeric prefix,
/// [`RateError::OutOfRange`] if the scaled value overflows `u64`.
pub fn parse_rate(input: &str) -> Result<ParsedRate, RateError> {
    let (int_part, frac_part) = numeric_prefix(input.trim_start());

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(RateError::MalformedSample(input.to_string()));
    }

    let truncated_digits = frac_part.len().saturating_sub(FRACTION_DIGITS);
    let kept = &frac_part[..frac_part.len().min(FRACTION_DIGITS)];

    let mut digits = String::with_capacity(int_part.len() + FRACTION_DIGITS);
    digits.push_str(int_part);
    digits.push_str(kept);
    for _ in kept.len()..FRACTION_DIGITS {
        digits.push('0');
    }

    let micro_units = u64::from_str_radix(&digits, 10)
        .map_err(|_| RateError::OutOfRange(input.to_string()))?;

    Ok(ParsedRate {
        micro_units,
        truncated_digits,
    })
}

/// Render a micro-unit value as a decimal string with six fractional digits.
pub fn format_micro(micro_units: u64) -> String {
    format!(
        "{}.{:06}",
        micro_units / MICRO_SCALE,
        micro_units % MICRO_SCALE
    )
}

/// Split the leading `digits[.digits]` run into integer and fractional parts.
///
/// Both parts are ASCII digits only; either may be empty.
fn numeric_prefix(input: &str) -> (&str, &str) {
    let int_end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let int_part = &input[..int_end];

    let rest = &input[int_end..];
    let frac_part = match rest.strip_prefix('.') {
        Some(after_point) => {
            let frac_end = after_point
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_point.len());
            &after_point[..frac_end]
        }
        None => "",
    };

    (int_part, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer() {
        let rate = parse_rate("7").unwrap();
        assert_eq!(rate.micro_units, 7_000_000);
        assert!(!rate.precision_overflow());
    }

    #[test]
    fn test_parse_pads_short_fraction() {
        assert_eq!(parse_rate("3.1").unwrap().micro_units, 3_100_000);
        assert_eq!(parse_rate("12.345").unwrap().micro_units, 12_345_000);
        assert_eq!(parse_rate("0.000001").unwrap().micro_units, 1);
    }

    #[test]
    fn test_parse_truncates_long_fraction() {
        let rate = parse_rate("1.23456789").unwrap();
        assert_eq!(rate.micro_units, 1_234_567);
        assert_eq!(rate.truncated_digits, 2);
        assert!(rate.precision_overflow());
    }

    #[test]
    fn test_parse_truncates_not_rounds() {
        // 0.9999999 would round up to 1.000000
        assert_eq!(parse_rate("0.9999999").unwrap().micro_units, 999_999);
    }

    #[test]
    fn test_parse_leading_zeros_are_decimal() {
        assert_eq!(parse_rate("010.5").unwrap().micro_units, 10_500_000);
        assert_eq!(parse_rate("0008").unwrap().micro_units, 8_000_000);
    }

    #[test]
    fn test_parse_discards_trailing_characters() {
        assert_eq!(parse_rate("12.5,\"x\":1}").unwrap().micro_units, 12_500_000);
        assert_eq!(parse_rate("4}}").unwrap().micro_units, 4_000_000);
        // Second decimal point ends the number
        assert_eq!(parse_rate("1.2.3").unwrap().micro_units, 1_200_000);
    }

    #[test]
    fn test_parse_partial_forms() {
        assert_eq!(parse_rate(".5").unwrap().micro_units, 500_000);
        assert_eq!(parse_rate("5.").unwrap().micro_units, 5_000_000);
    }

    #[test]
    fn test_parse_malformed() {
        for input in ["", ".", "abc", "-3.2", "null", ".x"] {
            let err = parse_rate(input).unwrap_err();
            assert!(
                matches!(err, RateError::MalformedSample(_)),
                "expected malformed for {:?}, got {:?}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_parse_out_of_range() {
        let err = parse_rate("99999999999999999999").unwrap_err();
        assert!(matches!(err, RateError::OutOfRange(_)));
    }

    #[test]
    fn test_format_micro() {
        assert_eq!(format_micro(0), "0.000000");
        assert_eq!(format_micro(1), "0.000001");
        assert_eq!(format_micro(12_345_000), "12.345000");
    }

    #[test]
    fn test_error_display() {
        let err = RateError::MalformedSample("abc".to_string());
        assert!(err.to_string().contains("Malformed sample"));
        assert!(err.to_string().contains("abc"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_integer_part_survives(
                int_part in 0u64..10_000_000_000,
                frac in "[0-9]{0,6}",
            ) {
                let input = if frac.is_empty() {
                    int_part.to_string()
                } else {
                    format!("{}.{}", int_part, frac)
                };
                let rate = parse_rate(&input)?;
                prop_assert_eq!(rate.micro_units / MICRO_SCALE, int_part);
                prop_assert!(!rate.precision_overflow());
            }

            #[test]
            fn test_format_roundtrip(
                int_part in 0u64..10_000_000_000,
                frac in "[0-9]{0,6}",
                trailer in "[a-z,}\" ]{0,4}",
            ) {
                let input = format!("{}.{}{}", int_part, frac, trailer);
                let rate = parse_rate(&input)?;
                let expected = format!("{}.{:0<6}", int_part, frac);
                prop_assert_eq!(format_micro(rate.micro_units), expected);
            }
        }
    }
}
