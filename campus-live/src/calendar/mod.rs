//! Calendar snapshot providers
//!
//! A provider returns the bookings of one calendar overlapping a time window,
//! sorted ascending by start, every instant carrying an explicit offset.
//! Raw calendar data is normalized exactly once, in [`normalize`], at the
//! point where it enters the system.

use crate::model::BookingWindow;
use async_trait::async_trait;
use campus_common::config::{CalendarMode, CampusConfig};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod demo;
pub mod fixed;
pub mod google;
pub mod normalize;

pub use demo::DemoCalendarProvider;
pub use fixed::FixedCalendarProvider;
pub use google::GoogleCalendarProvider;

/// Calendar provider errors
///
/// Never fatal: the reconciler treats any of these as "no known bookings".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Calendar API returned {0}: {1}")]
    Status(u16, String),

    #[error("Could not decode calendar data: {0}")]
    Decode(String),

    #[error("Calendar fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("No calendar provider configured")]
    NotConfigured,
}

/// Source of booking windows for a calendar binding
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Bookings of `calendar_id` overlapping `[from, to)`, sorted by start
    async fn fetch_window(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingWindow>, ProviderError>;
}

/// Provider used when no calendar is configured
///
/// Every fetch fails, so every pass runs degraded.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCalendarProvider;

#[async_trait]
impl CalendarProvider for DisabledCalendarProvider {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn fetch_window(
        &self,
        _calendar_id: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<BookingWindow>, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}

/// First booking covering `at` in a start-sorted snapshot
///
/// Scanning stops at the first booking that starts after `at`.
pub fn active_booking(windows: &[BookingWindow], at: DateTime<Utc>) -> Option<&BookingWindow> {
    for window in windows {
        if window.starts_after(at) {
            break;
        }
        if window.covers(at) {
            return Some(window);
        }
    }
    None
}

/// Build the provider selected by `[calendar] mode`
pub fn from_config(config: &CampusConfig) -> crate::Result<Arc<dyn CalendarProvider>> {
    let offset = config.offset()?;

    let provider: Arc<dyn CalendarProvider> = match config.calendar.mode {
        CalendarMode::Disabled => Arc::new(DisabledCalendarProvider),
        CalendarMode::Fixed => Arc::new(
            FixedCalendarProvider::from_config(&config.calendar.bookings, offset)
                .map_err(|e| crate::Error::Config(format!("calendar.bookings: {}", e)))?,
        ),
        CalendarMode::Demo => Arc::new(DemoCalendarProvider::new(offset)),
        CalendarMode::Google => {
            let base_url = config.calendar.base_url.as_deref().ok_or_else(|| {
                crate::Error::Config("calendar.base_url is required in google mode".to_string())
            })?;
            Arc::new(
                GoogleCalendarProvider::new(
                    base_url,
                    config.calendar.access_token.clone(),
                    config.calendar_timeout(),
                    offset,
                )
                .map_err(|e| crate::Error::Config(format!("calendar: {}", e)))?,
            )
        }
    };

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, FixedOffset, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 16, 4, 30, 0).unwrap()
    }

    fn window(title: &str, start_min: i64, end_min: i64) -> BookingWindow {
        let ist = FixedOffset::east_opt(19_800).unwrap();
        BookingWindow {
            start: (now() + ChronoDuration::minutes(start_min)).with_timezone(&ist),
            end: (now() + ChronoDuration::minutes(end_min)).with_timezone(&ist),
            title: title.to_string(),
            organizer: "Faculty".to_string(),
        }
    }

    #[test]
    fn test_active_booking_picks_covering_window() {
        let windows = vec![
            window("past", -120, -60),
            window("live", -15, 45),
            window("future", 60, 120),
        ];
        assert_eq!(active_booking(&windows, now()).unwrap().title, "live");
    }

    #[test]
    fn test_active_booking_none_between_bookings() {
        let windows = vec![window("past", -120, -60), window("future", 60, 120)];
        assert!(active_booking(&windows, now()).is_none());
        assert!(active_booking(&[], now()).is_none());
    }

    #[test]
    fn test_active_booking_returns_first_of_overlapping() {
        let windows = vec![window("long", -180, 180), window("short", -10, 10)];
        assert_eq!(active_booking(&windows, now()).unwrap().title, "long");
    }

    #[test]
    fn test_active_booking_stops_at_first_future_start() {
        // Unsorted input: a covering window after a future one is never reached
        let windows = vec![window("future", 60, 120), window("live", -15, 45)];
        assert!(active_booking(&windows, now()).is_none());
    }

    #[tokio::test]
    async fn test_disabled_provider_always_fails() {
        let provider = DisabledCalendarProvider;
        let result = provider.fetch_window("cal", now(), now()).await;
        assert_eq!(result, Err(ProviderError::NotConfigured));
    }

    #[test]
    fn test_from_config_disabled_by_default() {
        let provider = from_config(&CampusConfig::default()).unwrap();
        assert_eq!(provider.name(), "disabled");
    }
}
