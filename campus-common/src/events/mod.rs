//! Event types for the campus event system
//!
//! Provides shared event definitions and the EventBus used to fan live
//! occupancy changes out to every connected subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Live-state change for one space, as delivered to subscribers
///
/// Wire shape: `{spaceId, occupancy, isGhost, lastUpdated}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceUpdate {
    /// Space identifier
    pub space_id: String,
    /// People counted by the sensor in the last accepted reading
    pub occupancy: u32,
    /// Booked but empty
    pub is_ghost: bool,
    /// Timestamp of the reading that produced this state
    pub last_updated: DateTime<Utc>,
}

/// Campus event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CampusEvent {
    /// A reconciliation pass replaced the live state of a space
    ///
    /// Triggers:
    /// - SSE: Update dashboard cards
    SpaceUpdated(SpaceUpdate),

    /// Operator-raised alert for every connected client
    ///
    /// Triggers:
    /// - SSE: Show banner on all dashboards
    AlertRaised {
        /// Free-text alert message
        message: String,
        /// When the alert was raised
        timestamp: DateTime<Utc>,
    },
}

impl CampusEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            CampusEvent::SpaceUpdated(_) => "SpaceUpdated",
            CampusEvent::AlertRaised { .. } => "AlertRaised",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`: every receiver subscribed at the
/// moment of `emit` gets its own copy of the event. A slow or dropped receiver
/// never blocks the sender or the other receivers.
pub struct EventBus {
    tx: broadcast::Sender<CampusEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events buffered per receiver before the
    ///   oldest are dropped for that receiver
    ///
    /// # Examples
    ///
    /// ```
    /// use campus_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(1000);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CampusEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CampusEvent,
    ) -> Result<usize, broadcast::error::SendError<CampusEvent>> {
        self.tx.send(event)
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(space_id: &str, occupancy: u32) -> CampusEvent {
        CampusEvent::SpaceUpdated(SpaceUpdate {
            space_id: space_id.to_string(),
            occupancy,
            is_ghost: false,
            last_updated: Utc::now(),
        })
    }

    #[test]
    fn test_space_update_wire_shape() {
        let event = update("S1", 5);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "SpaceUpdated");
        assert_eq!(json["spaceId"], "S1");
        assert_eq!(json["occupancy"], 5);
        assert_eq!(json["isGhost"], false);
        assert!(json["lastUpdated"].is_string());
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(update("S1", 0).event_type(), "SpaceUpdated");
        let alert = CampusEvent::AlertRaised {
            message: "hello".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(alert.event_type(), "AlertRaised");
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(update("S1", 1)).is_err());
    }

    #[tokio::test]
    async fn test_subscriber_only_sees_later_events() {
        let bus = EventBus::new(10);
        let mut early = bus.subscribe();

        bus.emit(update("S1", 1)).unwrap();
        let mut late = bus.subscribe();
        bus.emit(update("S1", 2)).unwrap();

        let occupancy_of = |event: CampusEvent| match event {
            CampusEvent::SpaceUpdated(update) => update.occupancy,
            other => panic!("unexpected event: {:?}", other),
        };

        assert_eq!(occupancy_of(early.recv().await.unwrap()), 1);
        assert_eq!(occupancy_of(early.recv().await.unwrap()), 2);
        assert_eq!(occupancy_of(late.recv().await.unwrap()), 2);
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn test_capacity_is_reported() {
        assert_eq!(EventBus::new(500).capacity(), 500);
        assert_eq!(EventBus::new(0).capacity(), 1);
    }
}
