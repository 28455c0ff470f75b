//! Human-readable interval parsing for the date-age operators

use once_cell::sync::Lazy;
use regex::Regex;

static INTERVAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(minute|hour|day|week)s?").expect("valid regex"));

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;
const WEEK_MS: i64 = 604_800_000;

/// Parse an interval like "2 days" or "1 hour" into milliseconds.
///
/// Matches a single `<integer> <unit>[s]` token anywhere in the text,
/// case-insensitive. Returns 0 when no token is found.
pub fn parse_interval_ms(text: &str) -> i64 {
    let Some(caps) = INTERVAL_RE.captures(text) else {
        return 0;
    };
    let amount: i64 = caps[1].parse().unwrap_or(0);
    let multiplier = match caps[2].to_ascii_lowercase().as_str() {
        "minute" => MINUTE_MS,
        "hour" => HOUR_MS,
        "day" => DAY_MS,
        "week" => WEEK_MS,
        _ => 0,
    };
    amount * multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_interval_ms("1 minute"), 60_000);
        assert_eq!(parse_interval_ms("2 hours"), 7_200_000);
        assert_eq!(parse_interval_ms("2 days"), 172_800_000);
        assert_eq!(parse_interval_ms("3 weeks"), 1_814_400_000);
    }

    #[test]
    fn case_insensitive_and_embedded() {
        assert_eq!(parse_interval_ms("older than 2 DAYS ago"), 172_800_000);
        assert_eq!(parse_interval_ms("1Hour"), 3_600_000);
    }

    #[test]
    fn no_match_yields_zero() {
        assert_eq!(parse_interval_ms("soon"), 0);
        assert_eq!(parse_interval_ms(""), 0);
        assert_eq!(parse_interval_ms("2 months"), 0);
    }
}
