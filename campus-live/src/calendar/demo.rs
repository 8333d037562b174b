//! Demo calendar provider
//!
//! Every calendar gets the same three bookings placed around the current
//! time, so a dashboard demo always has a class in progress:
//! - a finished class (2h ago to 1h ago)
//! - a live class (15 min ago to 45 min from now)
//! - a future workshop (1h to 2h from now)

use super::{CalendarProvider, ProviderError};
use crate::model::BookingWindow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::debug;

const DEMO_SCHEDULE: [(&str, &str, i64, i64); 3] = [
    ("Completed Class (History)", "prof.doe@university.edu", -120, -60),
    ("CS101 - Intro to AI (Live)", "dr.smith@university.edu", -15, 45),
    ("Future Workshop (Robotics)", "lab.admin@university.edu", 60, 120),
];

/// Calendar provider generating a schedule relative to the wall clock
#[derive(Debug, Clone)]
pub struct DemoCalendarProvider {
    offset: FixedOffset,
}

impl DemoCalendarProvider {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

#[async_trait]
impl CalendarProvider for DemoCalendarProvider {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn fetch_window(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingWindow>, ProviderError> {
        debug!(calendar_id = %calendar_id, "Serving demo schedule");
        let now = Utc::now();

        Ok(DEMO_SCHEDULE
            .iter()
            .map(|(title, organizer, start_min, end_min)| BookingWindow {
                start: (now + Duration::minutes(*start_min)).with_timezone(&self.offset),
                end: (now + Duration::minutes(*end_min)).with_timezone(&self.offset),
                title: title.to_string(),
                organizer: organizer.to_string(),
            })
            .filter(|w| w.start.with_timezone(&Utc) < to && w.end.with_timezone(&Utc) >= from)
            .collect())
    }
}
