//! Human-readable durations for configuration values such as `stale_after = "7d"`.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serializer};

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const SECS_PER_WEEK: u64 = 7 * SECS_PER_DAY;

/// Largest unit first, so formatting picks the coarsest exact unit.
const UNITS: [(char, u64); 5] = [
    ('w', SECS_PER_WEEK),
    ('d', SECS_PER_DAY),
    ('h', SECS_PER_HOUR),
    ('m', SECS_PER_MINUTE),
    ('s', 1),
];

/// Parse a duration string like "2w", "7d", "24h", "30m" or "60s".
///
/// The input is case-insensitive and surrounding whitespace is ignored.
///
/// # Examples
///
/// ```
/// use wealthbook::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(7 * 24 * 60 * 60));
/// assert_eq!(parse_duration("2w").unwrap(), Duration::from_secs(14 * 24 * 60 * 60));
/// assert_eq!(parse_duration(" 90M ").unwrap(), Duration::from_secs(90 * 60));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let unit = s.chars().last().context("Duration is empty")?;
    let secs_per_unit = UNITS
        .iter()
        .find(|(suffix, _)| *suffix == unit)
        .map(|(_, secs)| *secs)
        .context("Duration must end with w, d, h, m, or s")?;

    let num: u64 = s[..s.len() - unit.len_utf8()]
        .trim()
        .parse()
        .with_context(|| format!("Invalid number in duration {s:?}"))?;
    let secs = num
        .checked_mul(secs_per_unit)
        .context("Duration is too large")?;

    Ok(Duration::from_secs(secs))
}

/// Format a duration with the largest unit that divides it evenly.
///
/// ```
/// use wealthbook::duration::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(7 * 24 * 60 * 60)), "1w");
/// assert_eq!(format_duration(Duration::from_secs(3 * 24 * 60 * 60)), "3d");
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// ```
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    for (suffix, unit) in UNITS {
        if secs >= unit && secs % unit == 0 {
            return format!("{}{suffix}", secs / unit);
        }
    }
    format!("{secs}s")
}

/// Whole days in `d`, rounded down.
pub fn whole_days(d: Duration) -> i64 {
    i64::try_from(d.as_secs() / SECS_PER_DAY).unwrap_or(i64::MAX)
}

/// Serde deserializer for duration strings.
///
/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

/// Serializes back into the same human-readable form.
pub fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_unit() {
        assert_eq!(parse_duration("1w").unwrap(), Duration::from_secs(SECS_PER_WEEK));
        assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(7 * SECS_PER_DAY));
        assert_eq!(parse_duration("48h").unwrap(), Duration::from_secs(48 * SECS_PER_HOUR));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(30 * SECS_PER_MINUTE));
        assert_eq!(parse_duration("60s").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn case_and_whitespace_are_ignored() {
        assert_eq!(parse_duration("  7D ").unwrap(), Duration::from_secs(7 * SECS_PER_DAY));
        assert_eq!(parse_duration("7 d").unwrap(), Duration::from_secs(7 * SECS_PER_DAY));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("7").is_err());
        assert!(parse_duration("7y").is_err());
        assert!(parse_duration("-1d").is_err());
        assert!(parse_duration("d").is_err());
        assert!(parse_duration("99999999999999999999w").is_err());
    }

    #[test]
    fn formats_with_coarsest_exact_unit() {
        assert_eq!(format_duration(Duration::from_secs(14 * SECS_PER_DAY)), "2w");
        assert_eq!(format_duration(Duration::from_secs(36 * SECS_PER_HOUR)), "36h");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn whole_days_rounds_down() {
        assert_eq!(whole_days(Duration::from_secs(7 * SECS_PER_DAY)), 7);
        assert_eq!(whole_days(Duration::from_secs(36 * SECS_PER_HOUR)), 1);
        assert_eq!(whole_days(Duration::from_secs(60)), 0);
    }
}
