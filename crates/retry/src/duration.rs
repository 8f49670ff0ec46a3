//! # Duration Literals
//!
//! Parses signed duration literals such as `10ms`, `3m`, `1h30m`, `1.5s` or `-2s`.
//!
//! A literal is an optional sign followed by one or more `<decimal><unit>`
//! components. Supported units: `ns`, `us` (`µs`, `μs`), `ms`, `s`, `m`, `h`.
//! The bare literal `0` is accepted without a unit.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Largest representable magnitude, in nanoseconds (signed 64-bit range).
const MAX_NANOS: u128 = i64::MAX as u128;

/// Longest fractional part that is taken into account.
const MAX_FRACTION_DIGITS: usize = 18;

// One component: optional integer part, optional fraction, then the unit.
static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<int>\d*)(?:\.(?P<frac>\d*))?(?P<unit>[^\d.]*)")
        .expect("Failed to compile duration component regex - this should never happen")
});

/// Errors returned by [`parse_duration`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDurationError {
    /// The literal is empty (or only whitespace)
    #[error("duration literal cannot be empty")]
    Empty,

    /// The literal is not of the form `[+-]<decimal><unit>...`
    #[error("invalid duration literal '{0}'")]
    Invalid(String),

    /// A numeric component has no unit
    #[error("missing unit in duration literal '{0}'")]
    MissingUnit(String),

    /// A component uses a unit that is not recognised
    #[error("unknown unit '{unit}' in duration literal '{input}'")]
    UnknownUnit { unit: String, input: String },

    /// The literal does not fit in a signed 64-bit nanosecond count
    #[error("duration literal '{0}' is out of range")]
    Overflow(String),
}

/// A parsed duration literal together with its sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedDuration {
    /// `true` when the literal started with `-` and is non-zero
    pub negative: bool,
    /// Absolute value of the literal
    pub magnitude: Duration,
}

impl SignedDuration {
    /// `true` for a strictly positive duration
    pub fn is_positive(&self) -> bool {
        !self.negative && !self.magnitude.is_zero()
    }
}

/// Parse a signed duration literal
///
/// # Errors
///
/// Returns a [`ParseDurationError`] describing the first problem found.
pub fn parse_duration(literal: &str) -> Result<SignedDuration, ParseDurationError> {
    let input = literal.trim();
    if input.is_empty() {
        return Err(ParseDurationError::Empty);
    }

    let (negative, body) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    if body == "0" {
        return Ok(SignedDuration {
            negative: false,
            magnitude: Duration::ZERO,
        });
    }
    if body.is_empty() {
        return Err(ParseDurationError::Invalid(input.to_string()));
    }

    let mut total: u128 = 0;
    let mut rest = body;
    while !rest.is_empty() {
        let captures = COMPONENT
            .captures(rest)
            .ok_or_else(|| ParseDurationError::Invalid(input.to_string()))?;
        let consumed = captures.get(0).map_or(0, |m| m.end());

        let int_part = captures.name("int").map_or("", |m| m.as_str());
        let frac_part = captures.name("frac").map_or("", |m| m.as_str());
        let unit = captures.name("unit").map_or("", |m| m.as_str());

        // ".s" and "" have no digits at all
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseDurationError::Invalid(input.to_string()));
        }
        if unit.is_empty() {
            return Err(ParseDurationError::MissingUnit(input.to_string()));
        }

        let unit_nanos = unit_in_nanos(unit).ok_or_else(|| ParseDurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let whole = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse::<u128>()
                .map_err(|_| ParseDurationError::Overflow(input.to_string()))?
        };
        let component = whole
            .checked_mul(unit_nanos)
            .and_then(|n| n.checked_add(fraction_in_nanos(frac_part, unit_nanos)))
            .ok_or_else(|| ParseDurationError::Overflow(input.to_string()))?;

        total = total
            .checked_add(component)
            .filter(|n| *n <= MAX_NANOS)
            .ok_or_else(|| ParseDurationError::Overflow(input.to_string()))?;

        rest = &rest[consumed..];
    }

    // MAX_NANOS fits in u64
    let nanos = u64::try_from(total).map_err(|_| ParseDurationError::Overflow(input.to_string()))?;
    let magnitude = Duration::from_nanos(nanos);

    Ok(SignedDuration {
        negative: negative && !magnitude.is_zero(),
        magnitude,
    })
}

fn unit_in_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

/// Value of a fractional component (the digits after the point), truncated to nanoseconds.
fn fraction_in_nanos(digits: &str, unit_nanos: u128) -> u128 {
    let digits = &digits[..digits.len().min(MAX_FRACTION_DIGITS)];
    if digits.is_empty() {
        return 0;
    }
    let Ok(value) = digits.parse::<u128>() else {
        return 0;
    };
    let scale = 10u128.pow(u32::try_from(digits.len()).unwrap_or(0));
    value * unit_nanos / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positive(literal: &str) -> Duration {
        let parsed = parse_duration(literal).unwrap();
        assert!(!parsed.negative, "{literal} should not be negative");
        parsed.magnitude
    }

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(positive("10ms"), Duration::from_millis(10));
        assert_eq!(positive("3m"), Duration::from_secs(180));
        assert_eq!(positive("2h"), Duration::from_secs(7200));
        assert_eq!(positive("15s"), Duration::from_secs(15));
        assert_eq!(positive("250us"), Duration::from_micros(250));
        assert_eq!(positive("250µs"), Duration::from_micros(250));
        assert_eq!(positive("42ns"), Duration::from_nanos(42));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(positive("1h30m"), Duration::from_secs(5400));
        assert_eq!(positive("1.5s"), Duration::from_millis(1500));
        assert_eq!(positive(".5s"), Duration::from_millis(500));
        assert_eq!(positive("1.s"), Duration::from_secs(1));
        assert_eq!(positive("1m0.25s"), Duration::from_millis(60_250));
    }

    #[test]
    fn test_parse_sign() {
        let negative = parse_duration("-2s").unwrap();
        assert!(negative.negative);
        assert_eq!(negative.magnitude, Duration::from_secs(2));
        assert!(!negative.is_positive());

        assert!(parse_duration("+2s").unwrap().is_positive());
    }

    #[test]
    fn test_parse_zero() {
        let zero = parse_duration("0").unwrap();
        assert_eq!(zero.magnitude, Duration::ZERO);
        assert!(!zero.is_positive());

        // "-0s" is zero, not negative
        assert!(!parse_duration("-0s").unwrap().negative);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_duration(""), Err(ParseDurationError::Empty));
        assert_eq!(parse_duration("   "), Err(ParseDurationError::Empty));
        assert!(matches!(
            parse_duration("-"),
            Err(ParseDurationError::Invalid(_))
        ));
        assert!(matches!(
            parse_duration("10"),
            Err(ParseDurationError::MissingUnit(_))
        ));
        assert!(matches!(
            parse_duration(".s"),
            Err(ParseDurationError::Invalid(_))
        ));
        assert!(matches!(
            parse_duration("10d"),
            Err(ParseDurationError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_duration("ms"),
            Err(ParseDurationError::Invalid(_))
        ));
        assert!(matches!(
            parse_duration("3000000h"),
            Err(ParseDurationError::Overflow(_))
        ));
    }
}
