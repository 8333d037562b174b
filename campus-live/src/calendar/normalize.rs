//! Boundary normalization of raw calendar data
//!
//! Accepted time formats:
//! - RFC 3339 with offset (`2026-01-16T10:00:00+05:30`, `...Z`)
//! - Local date-time without offset (`2026-01-16T10:00[:00]`), read in the
//!   campus offset
//! - All-day date (`2026-01-16`), midnight in the campus offset

use super::ProviderError;
use crate::model::BookingWindow;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use tracing::warn;

/// Booking as delivered by a calendar source, times still as text
#[derive(Debug, Clone, Default)]
pub struct RawBooking {
    pub title: Option<String>,
    pub organizer: Option<String>,
    pub start: String,
    pub end: String,
}

/// Parse one calendar time into an instant with an explicit offset
pub fn normalize_instant(text: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>, ProviderError> {
    let text = text.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| offset.from_local_datetime(&midnight).single())
            .ok_or_else(|| ProviderError::Decode(format!("Unrepresentable date '{}'", text)));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| ProviderError::Decode(format!("Unrepresentable time '{}'", text)));
        }
    }

    Err(ProviderError::Decode(format!("Unrecognized calendar time '{}'", text)))
}

/// Normalize raw bookings into sorted booking windows
///
/// A booking that ends before it starts is dropped with a warning; any
/// unparseable time fails the whole snapshot.
pub fn normalize_bookings(
    raw: Vec<RawBooking>,
    offset: FixedOffset,
) -> Result<Vec<BookingWindow>, ProviderError> {
    let mut windows = Vec::with_capacity(raw.len());

    for booking in raw {
        let start = normalize_instant(&booking.start, offset)?;
        let end = normalize_instant(&booking.end, offset)?;

        if end < start {
            warn!(start = %booking.start, end = %booking.end, "Dropping booking that ends before it starts");
            continue;
        }

        windows.push(BookingWindow {
            start,
            end,
            title: booking
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Booked".to_string()),
            organizer: booking
                .organizer
                .filter(|o| !o.trim().is_empty())
                .unwrap_or_else(|| "Faculty".to_string()),
        });
    }

    windows.sort_by_key(|w| w.start);
    Ok(windows)
}
