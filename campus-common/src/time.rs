//! Timestamp utilities

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Format a timestamp for storage
///
/// Always microsecond precision with a `Z` suffix, so lexical order of the
/// stored text equals chronological order.
pub fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp written by [`to_db_timestamp`]
///
/// Also accepts SQLite's `CURRENT_TIMESTAMP` format (`YYYY-MM-DD HH:MM:SS`).
pub fn from_db_timestamp(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::CorruptRecord(format!("Bad timestamp '{}': {}", text, e)))
}

/// Parse a UTC offset such as `+05:30`, `-08:00` or `Z`
pub fn parse_utc_offset(text: &str) -> Result<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return Ok(utc_offset());
    }

    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => return Err(Error::Config(format!("UTC offset must start with + or -: '{}'", text))),
    };

    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| Error::Config(format!("UTC offset must be ±HH:MM: '{}'", text)))?;
    let hours: u32 = hours
        .parse()
        .map_err(|_| Error::Config(format!("Bad UTC offset hours: '{}'", text)))?;
    let minutes: u32 = minutes
        .parse()
        .map_err(|_| Error::Config(format!("Bad UTC offset minutes: '{}'", text)))?;
    if minutes >= 60 || hours > 23 {
        return Err(Error::Config(format!("UTC offset out of range: '{}'", text)));
    }

    FixedOffset::east_opt(sign * (hours as i32 * 3600 + minutes as i32 * 60))
        .ok_or_else(|| Error::Config(format!("UTC offset out of range: '{}'", text)))
}

/// The zero offset
pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Three-letter day of week (`Sun`..`Sat`) of `ts` as seen from `offset`
pub fn day_of_week(ts: &DateTime<Utc>, offset: &FixedOffset) -> String {
    ts.with_timezone(offset).format("%a").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_millis_to_duration_one_second() {
        let duration = millis_to_duration(1000);
        assert_eq!(duration, Duration::from_secs(1));
    }

    #[test]
    fn test_db_timestamp_roundtrip_preserves_micros() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 16, 10, 0, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        let text = to_db_timestamp(&ts);
        assert_eq!(text, "2026-01-16T10:00:00.123456Z");
        assert_eq!(from_db_timestamp(&text).unwrap(), ts);
    }

    #[test]
    fn test_db_timestamp_lexical_order_matches_time_order() {
        let a = Utc.with_ymd_and_hms(2026, 1, 16, 10, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(500);
        let c = a + chrono::Duration::seconds(1);
        assert!(to_db_timestamp(&a) < to_db_timestamp(&b));
        assert!(to_db_timestamp(&b) < to_db_timestamp(&c));
    }

    #[test]
    fn test_from_db_timestamp_accepts_sqlite_current_timestamp() {
        let ts = from_db_timestamp("2026-01-16 10:00:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 1, 16, 10, 0, 0).unwrap());
        assert!(from_db_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19_800);
        assert_eq!(parse_utc_offset("-08:00").unwrap().local_minus_utc(), -28_800);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("05:30").is_err());
        assert!(parse_utc_offset("+5").is_err());
        assert!(parse_utc_offset("+05:75").is_err());
        assert!(parse_utc_offset("+30:00").is_err());
    }

    #[test]
    fn test_day_of_week_uses_offset() {
        // Saturday 20:00 UTC is already Sunday in +05:30
        let ts = Utc.with_ymd_and_hms(2026, 1, 17, 20, 0, 0).unwrap();
        assert_eq!(day_of_week(&ts, &utc_offset()), "Sat");
        assert_eq!(day_of_week(&ts, &parse_utc_offset("+05:30").unwrap()), "Sun");
    }
}
