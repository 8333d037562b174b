//! Domain types of the live-occupancy core

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A physical room tracked by the system
///
/// Provisioned externally; read-only to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub space_id: String,
    pub name: String,
    /// Classroom, Laboratory, Seminar Hall, Library, Office
    pub kind: String,
    pub capacity: u32,
    /// Vision sensor reporting for this space
    pub sensor_id: Option<String>,
    /// External calendar holding this space's bookings
    pub calendar_id: Option<String>,
}

/// Current derived occupancy snapshot for one space
///
/// `occupied` is always `occupancy > 0`, and `is_ghost` implies
/// `occupancy == 0`; both are enforced by the constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveState {
    occupancy: u32,
    occupied: bool,
    is_ghost: bool,
    timestamp: DateTime<Utc>,
    #[serde(skip)]
    calendar_degraded: bool,
}

impl LiveState {
    /// Derive the state for a reading
    ///
    /// `booked` is whether a booking covers `timestamp`.
    pub fn derive(
        person_count: u32,
        booked: bool,
        timestamp: DateTime<Utc>,
        calendar_degraded: bool,
    ) -> Self {
        Self {
            occupancy: person_count,
            occupied: person_count > 0,
            is_ghost: booked && person_count == 0,
            timestamp,
            calendar_degraded,
        }
    }

    /// Rebuild a state read back from storage
    ///
    /// A stored ghost flag on an occupied row is dropped.
    pub fn restore(
        occupancy: u32,
        is_ghost: bool,
        timestamp: DateTime<Utc>,
        calendar_degraded: bool,
    ) -> Self {
        Self::derive(occupancy, is_ghost, timestamp, calendar_degraded)
    }

    pub fn occupancy(&self) -> u32 {
        self.occupancy
    }

    pub fn occupied(&self) -> bool {
        self.occupied
    }

    pub fn is_ghost(&self) -> bool {
        self.is_ghost
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The pass that produced this state ran without a calendar snapshot
    pub fn calendar_degraded(&self) -> bool {
        self.calendar_degraded
    }
}

/// A scheduled reservation, normalized to an explicit offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub title: String,
    pub organizer: String,
}

impl BookingWindow {
    /// `start <= at <= end`
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start.with_timezone(&Utc) <= at && at <= self.end.with_timezone(&Utc)
    }

    /// `start > at`
    pub fn starts_after(&self, at: DateTime<Utc>) -> bool {
        self.start.with_timezone(&Utc) > at
    }
}

/// Immutable snapshot of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub guid: Uuid,
    pub space_id: String,
    pub occupancy: u32,
    pub capacity: u32,
    pub is_ghost: bool,
    /// `Sun`..`Sat` in the campus offset
    pub day_of_week: String,
    pub timestamp: DateTime<Utc>,
}

/// One occupancy reading from a vision sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryReading {
    pub sensor_id: String,
    pub person_count: u32,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryReading {
    pub fn new(sensor_id: impl Into<String>, person_count: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            person_count,
            timestamp,
        }
    }
}

/// Result of ingesting one reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    /// False when the reading was older than the current state and ignored
    pub accepted: bool,
    pub is_ghost: bool,
    pub space_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 16, 4, 30, 0).unwrap()
    }

    #[test]
    fn test_occupied_follows_occupancy() {
        for count in [0u32, 1, 5, 40] {
            for booked in [false, true] {
                let state = LiveState::derive(count, booked, at(), false);
                assert_eq!(state.occupied(), count > 0);
                assert_eq!(state.is_ghost(), booked && count == 0);
            }
        }
    }

    #[test]
    fn test_restore_drops_inconsistent_ghost_flag() {
        let state = LiveState::restore(3, true, at(), false);
        assert!(state.occupied());
        assert!(!state.is_ghost());
    }

    #[test]
    fn test_booking_covers_is_inclusive() {
        let ist = FixedOffset::east_opt(19_800).unwrap();
        let window = BookingWindow {
            start: (at() - Duration::minutes(15)).with_timezone(&ist),
            end: (at() + Duration::minutes(45)).with_timezone(&ist),
            title: "CS101".to_string(),
            organizer: "dr.smith@university.edu".to_string(),
        };

        assert!(window.covers(at()));
        assert!(window.covers(at() - Duration::minutes(15)));
        assert!(window.covers(at() + Duration::minutes(45)));
        assert!(!window.covers(at() + Duration::minutes(46)));
        assert!(!window.starts_after(at()));
        assert!(window.starts_after(at() - Duration::minutes(16)));
    }

    #[test]
    fn test_live_state_json_hides_degraded_flag() {
        let json = serde_json::to_value(LiveState::derive(0, true, at(), true)).unwrap();
        assert_eq!(json["occupancy"], 0);
        assert_eq!(json["occupied"], false);
        assert_eq!(json["isGhost"], true);
        assert!(json.get("calendarDegraded").is_none());
    }
}
