//! In-memory calendar provider
//!
//! Serves a fixed set of bookings per calendar. Backs `mode = "fixed"` and
//! the test suites.

use super::normalize::{normalize_bookings, RawBooking};
use super::{CalendarProvider, ProviderError};
use crate::model::BookingWindow;
use async_trait::async_trait;
use campus_common::config::BookingConfig;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Calendar provider backed by an in-memory booking table
#[derive(Debug, Default)]
pub struct FixedCalendarProvider {
    bookings: RwLock<HashMap<String, Vec<BookingWindow>>>,
}

impl FixedCalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `[[calendar.bookings]]` entries
    pub fn from_config(entries: &[BookingConfig], offset: FixedOffset) -> Result<Self, ProviderError> {
        let provider = Self::new();

        for entry in entries {
            let raw = RawBooking {
                title: Some(entry.title.clone()),
                organizer: Some(entry.organizer.clone()),
                start: entry.start.clone(),
                end: entry.end.clone(),
            };
            for window in normalize_bookings(vec![raw], offset)? {
                provider.add_booking(&entry.calendar_id, window);
            }
        }

        Ok(provider)
    }

    /// Add one booking to a calendar
    pub fn add_booking(&self, calendar_id: &str, window: BookingWindow) {
        let mut bookings = self.bookings.write().unwrap_or_else(|e| e.into_inner());
        let calendar = bookings.entry(calendar_id.to_string()).or_default();
        calendar.push(window);
        calendar.sort_by_key(|w| w.start);
    }

    /// Builder-style [`add_booking`](Self::add_booking)
    pub fn with_booking(self, calendar_id: &str, window: BookingWindow) -> Self {
        self.add_booking(calendar_id, window);
        self
    }

    /// Remove every booking of a calendar
    pub fn clear(&self, calendar_id: &str) {
        let mut bookings = self.bookings.write().unwrap_or_else(|e| e.into_inner());
        bookings.remove(calendar_id);
    }
}

#[async_trait]
impl CalendarProvider for FixedCalendarProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn fetch_window(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingWindow>, ProviderError> {
        let bookings = self.bookings.read().unwrap_or_else(|e| e.into_inner());

        Ok(bookings
            .get(calendar_id)
            .map(|windows| {
                windows
                    .iter()
                    .filter(|w| w.start.with_timezone(&Utc) < to && w.end.with_timezone(&Utc) >= from)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
