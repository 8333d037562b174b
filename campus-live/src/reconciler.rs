//! State Reconciler
//!
//! Combines one reading with the space's booking snapshot into a new
//! [`LiveState`], then hands that state to the History Recorder and the
//! Update Broadcaster.
//!
//! The calendar is queried before the space is locked and under a timeout,
//! so a slow provider delays only its own pass. Everything after the fetch
//! runs while holding the space: the stale check, the replacement, the
//! history append and the publish. That keeps one space's side effects in
//! the same order as its state changes.

use crate::broadcaster::UpdateBroadcaster;
use crate::calendar::{active_booking, CalendarProvider, ProviderError};
use crate::history::{HistoryPolicy, HistoryRecorder};
use crate::model::{BookingWindow, LiveState, Space};
use crate::state::LiveStateStore;
use crate::Result;
use campus_common::config::CampusConfig;
use campus_common::events::SpaceUpdate;
use campus_common::time::utc_offset;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for reconciliation passes
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Upper bound on one calendar fetch
    pub calendar_timeout: Duration,
    /// Length of the booking window fetched per pass
    pub lookahead: chrono::Duration,
    pub history_policy: HistoryPolicy,
    /// Campus local offset
    pub offset: FixedOffset,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            calendar_timeout: Duration::from_millis(3000),
            lookahead: chrono::Duration::days(7),
            history_policy: HistoryPolicy::EveryEvent,
            offset: utc_offset(),
        }
    }
}

impl ReconcilerSettings {
    pub fn from_config(config: &CampusConfig) -> Result<Self> {
        Ok(Self {
            calendar_timeout: config.calendar_timeout(),
            lookahead: chrono::Duration::days(config.calendar.lookahead_days as i64),
            history_policy: HistoryPolicy::from_config(&config.history),
            offset: config.offset()?,
        })
    }
}

/// Bookings fetched for one pass
///
/// A failed or timed-out fetch yields an empty, degraded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub bookings: Vec<BookingWindow>,
    pub degraded: bool,
}

impl ScheduleSnapshot {
    fn degraded() -> Self {
        Self {
            bookings: Vec::new(),
            degraded: true,
        }
    }
}

/// What one pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// False when the reading was older than the current state
    pub accepted: bool,
    /// State of the space after the pass; `None` when it could not be loaded
    pub state: Option<LiveState>,
    /// Title of the booking covering the reading, if any
    pub active_booking: Option<String>,
    /// History record appended by this pass
    pub recorded: bool,
    /// Subscribers reached by the publish
    pub delivered: usize,
}

pub struct Reconciler {
    calendar: Arc<dyn CalendarProvider>,
    store: Arc<LiveStateStore>,
    history: HistoryRecorder,
    broadcaster: UpdateBroadcaster,
    settings: ReconcilerSettings,
}

impl Reconciler {
    pub fn new(
        calendar: Arc<dyn CalendarProvider>,
        store: Arc<LiveStateStore>,
        history: HistoryRecorder,
        broadcaster: UpdateBroadcaster,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            calendar,
            store,
            history,
            broadcaster,
            settings,
        }
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub fn broadcaster(&self) -> &UpdateBroadcaster {
        &self.broadcaster
    }

    /// Run one reconciliation pass for `space`
    ///
    /// A stale reading is refused, as is any reading for a space whose
    /// stored state cannot be loaded. Calendar, live-state write and history
    /// failures are logged and the pass completes.
    pub async fn reconcile(
        &self,
        space: &Space,
        person_count: u32,
        at: DateTime<Utc>,
    ) -> ReconcileOutcome {
        let schedule = self.fetch_schedule(space, at).await;
        let booking = active_booking(&schedule.bookings, at);

        let mut guard = match self.store.lock(&space.space_id).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!(
                    space_id = %space.space_id,
                    reading = %at,
                    error = %e,
                    "Stored live state unavailable; refusing reading"
                );
                return ReconcileOutcome {
                    accepted: false,
                    state: None,
                    active_booking: booking.map(|b| b.title.clone()),
                    recorded: false,
                    delivered: 0,
                };
            }
        };

        if let Some(current) = guard.current() {
            if at < current.timestamp() {
                info!(
                    space_id = %space.space_id,
                    reading = %at,
                    current = %current.timestamp(),
                    "Ignoring reading older than current state"
                );
                return ReconcileOutcome {
                    accepted: false,
                    state: Some(current.clone()),
                    active_booking: booking.map(|b| b.title.clone()),
                    recorded: false,
                    delivered: 0,
                };
            }
        }

        let state = LiveState::derive(person_count, booking.is_some(), at, schedule.degraded);

        if state.is_ghost() {
            info!(
                space_id = %space.space_id,
                booking = booking.map(|b| b.title.as_str()).unwrap_or_default(),
                "Ghost booking: space booked but empty"
            );
        }

        if let Err(e) = guard.replace(state.clone()).await {
            warn!(space_id = %space.space_id, error = %e, "Failed to persist live state");
        }

        let recorded = match self.history.record(space, &state).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!(space_id = %space.space_id, error = %e, "Failed to append history record");
                false
            }
        };

        let delivered = self.broadcaster.publish(SpaceUpdate {
            space_id: space.space_id.clone(),
            occupancy: state.occupancy(),
            is_ghost: state.is_ghost(),
            last_updated: state.timestamp(),
        });

        debug!(
            space_id = %space.space_id,
            occupancy = state.occupancy(),
            is_ghost = state.is_ghost(),
            degraded = schedule.degraded,
            recorded,
            delivered,
            "Reconciled reading"
        );

        ReconcileOutcome {
            accepted: true,
            state: Some(state),
            active_booking: booking.map(|b| b.title.clone()),
            recorded,
            delivered,
        }
    }

    /// Bookings for `space` over `[from, from + lookahead)`
    ///
    /// A space with no calendar binding has no bookings and is not degraded.
    pub async fn fetch_schedule(&self, space: &Space, from: DateTime<Utc>) -> ScheduleSnapshot {
        let Some(calendar_id) = space.calendar_id.as_deref() else {
            return ScheduleSnapshot {
                bookings: Vec::new(),
                degraded: false,
            };
        };

        let to = from + self.settings.lookahead;
        let fetch = self.calendar.fetch_window(calendar_id, from, to);

        let result = match tokio::time::timeout(self.settings.calendar_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.settings.calendar_timeout)),
        };

        match result {
            Ok(bookings) => ScheduleSnapshot {
                bookings,
                degraded: false,
            },
            Err(e) => {
                warn!(
                    space_id = %space.space_id,
                    provider = self.calendar.name(),
                    error = %e,
                    "Calendar unavailable; reconciling without bookings"
                );
                ScheduleSnapshot::degraded()
            }
        }
    }

    /// Current state of a space, if it has ever been reconciled
    pub async fn live_state(&self, space_id: &str) -> Result<Option<LiveState>> {
        self.store.snapshot(space_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedCalendarProvider;
    use crate::db::{SqliteHistoryStore, SqliteSpaceStore};
    use campus_common::db::init_memory_database;
    use campus_common::events::EventBus;
    use chrono::TimeZone;

    fn space(calendar_id: Option<&str>) -> Space {
        Space {
            space_id: "S1".to_string(),
            name: "Chemistry Lab 101".to_string(),
            kind: "Laboratory".to_string(),
            capacity: 40,
            sensor_id: Some("CAM_001".to_string()),
            calendar_id: calendar_id.map(str::to_string),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 16, 4, 30, 0).unwrap()
    }

    async fn reconciler(calendar: Arc<dyn CalendarProvider>) -> Reconciler {
        let pool = init_memory_database().await.unwrap();
        // No spaces row: the live_state write fails its foreign key and is only logged
        let store = Arc::new(LiveStateStore::new(Arc::new(SqliteSpaceStore::new(pool.clone()))));
        let history = HistoryRecorder::new(
            Arc::new(SqliteHistoryStore::new(pool)),
            HistoryPolicy::EveryEvent,
            utc_offset(),
        );
        Reconciler::new(
            calendar,
            store,
            history,
            UpdateBroadcaster::new(Arc::new(EventBus::new(16))),
            ReconcilerSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_unbound_calendar_is_not_degraded() {
        let reconciler = reconciler(Arc::new(FixedCalendarProvider::new())).await;
        let schedule = reconciler.fetch_schedule(&space(None), now()).await;
        assert!(schedule.bookings.is_empty());
        assert!(!schedule.degraded);
    }

    #[tokio::test]
    async fn test_failing_calendar_is_degraded() {
        let reconciler = reconciler(Arc::new(crate::calendar::DisabledCalendarProvider)).await;

        let outcome = reconciler.reconcile(&space(Some("cal-s1")), 0, now()).await;
        assert!(outcome.accepted);
        let state = outcome.state.unwrap();
        assert!(!state.is_ghost());
        assert!(state.calendar_degraded());
    }

    #[tokio::test]
    async fn test_live_state_write_failure_does_not_abort_pass() {
        let calendar = FixedCalendarProvider::new().with_booking(
            "cal-s1",
            BookingWindow {
                start: (now() - chrono::Duration::minutes(15)).with_timezone(&utc_offset()),
                end: (now() + chrono::Duration::minutes(45)).with_timezone(&utc_offset()),
                title: "CS101".to_string(),
                organizer: "Faculty".to_string(),
            },
        );
        let reconciler = reconciler(Arc::new(calendar)).await;

        let outcome = reconciler.reconcile(&space(Some("cal-s1")), 0, now()).await;
        assert!(outcome.accepted);
        assert!(outcome.state.as_ref().unwrap().is_ghost());
        assert!(outcome.recorded);
        assert_eq!(outcome.active_booking.as_deref(), Some("CS101"));
        assert_eq!(reconciler.live_state("S1").await.unwrap(), outcome.state);
    }
}
