//! Parsing of human-written duration strings used in configuration.
//!
//! Accepts a sequence of decimal numbers, each with an optional fraction and
//! a mandatory unit suffix, such as `300ms`, `1.5h` or `2h45m`. Valid units
//! are `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. The result must be positive.

use std::time::Duration;

use crate::error::ConfigError;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Fraction digits beyond this are ignored (sub-nanosecond precision).
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a duration string like `30s` or `1m30s` into a [`Duration`].
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidDuration {
        value: input.to_string(),
        reason,
    };

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid("empty duration".into()));
    }

    let mut total_nanos: u128 = 0;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let (whole, fraction) = split_number(number).ok_or_else(|| {
            invalid(format!("expected a number before {unit:?}"))
        })?;

        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3_600 * NANOS_PER_SEC,
            "" => return Err(invalid(format!("missing unit after {number:?}"))),
            other => return Err(invalid(format!("unknown unit {other:?}"))),
        };

        let whole_nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid("duration overflows".into()))?;

        let fraction_nanos = fraction.map_or(0, |(digits, divisor)| digits * scale / divisor);

        total_nanos = whole_nanos
            .checked_add(fraction_nanos)
            .and_then(|part| total_nanos.checked_add(part))
            .ok_or_else(|| invalid("duration overflows".into()))?;

        rest = tail;
    }

    if total_nanos == 0 {
        return Err(invalid("duration must be positive".into()));
    }

    let nanos = u64::try_from(total_nanos).map_err(|_| invalid("duration overflows".into()))?;
    Ok(Duration::from_nanos(nanos))
}

/// Split `12.345` into `12` and `(345, 1000)`. Returns `None` when neither
/// side has digits or the text is not a plain decimal.
fn split_number(number: &str) -> Option<(u128, Option<(u128, u128)>)> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (number, None),
    };

    if whole.is_empty() && fraction.map_or(true, str::is_empty) {
        return None;
    }

    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().ok()?
    };

    let fraction_value = match fraction {
        None | Some("") => None,
        Some(digits) => {
            let digits = &digits[..digits.len().min(MAX_FRACTION_DIGITS)];
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let divisor = 10u128.pow(digits.len() as u32);
            Some((digits.parse::<u128>().ok()?, divisor))
        }
    };

    Some((whole_value, fraction_value))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3_600));
        assert_eq!(parse_duration("15us").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_duration("15µs").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn parses_compound_and_fractional() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h45m").unwrap(), Duration::from_secs(9_900));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1.s").unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse_duration("  45s ").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn rejects_missing_unit() {
        assert_matches!(
            parse_duration("30"),
            Err(ConfigError::InvalidDuration { reason, .. }) if reason.contains("missing unit")
        );
    }

    #[test]
    fn rejects_unknown_unit() {
        assert_matches!(
            parse_duration("3d"),
            Err(ConfigError::InvalidDuration { reason, .. }) if reason.contains("unknown unit")
        );
    }

    #[test]
    fn rejects_zero_and_empty() {
        assert_matches!(parse_duration("0s"), Err(ConfigError::InvalidDuration { .. }));
        assert_matches!(parse_duration(""), Err(ConfigError::InvalidDuration { .. }));
        assert_matches!(parse_duration("   "), Err(ConfigError::InvalidDuration { .. }));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_matches!(parse_duration(".s"), Err(ConfigError::InvalidDuration { .. }));
        assert_matches!(parse_duration("1.2.3s"), Err(ConfigError::InvalidDuration { .. }));
        assert_matches!(parse_duration("-5s"), Err(ConfigError::InvalidDuration { .. }));
    }

    #[test]
    fn rejects_overflow_instead_of_panicking() {
        for input in [
            "340282366920938463463374607431.999999999s",
            "340282366920938463463374607431s1ns",
            "99999999999999999999h",
            "18446744073709551616ns",
        ] {
            assert_matches!(
                parse_duration(input),
                Err(ConfigError::InvalidDuration { reason, .. }) if reason.contains("overflows"),
                "{input}"
            );
        }
    }
}
