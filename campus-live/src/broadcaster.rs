//! Update Broadcaster
//!
//! Publishes live-state changes on the shared [`EventBus`]. Each receiver
//! subscribed at the moment of publish gets its own copy; publishing never
//! waits on a receiver, and a receiver that lags or disconnects affects only
//! itself.

use campus_common::events::{CampusEvent, EventBus, SpaceUpdate};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct UpdateBroadcaster {
    bus: Arc<EventBus>,
}

impl UpdateBroadcaster {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Shared bus, for transports that subscribe directly
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Deliver `update` to every current subscriber
    ///
    /// Returns the number of subscribers reached; zero is not an error.
    pub fn publish(&self, update: SpaceUpdate) -> usize {
        let space_id = update.space_id.clone();
        match self.bus.emit(CampusEvent::SpaceUpdated(update)) {
            Ok(reached) => {
                debug!(space_id = %space_id, subscribers = reached, "Published space update");
                reached
            }
            Err(_) => {
                debug!(space_id = %space_id, "No subscribers for space update");
                0
            }
        }
    }

    /// Broadcast a free-text alert to every current subscriber
    pub fn raise_alert(&self, message: impl Into<String>) -> usize {
        let message = message.into();
        match self.bus.emit(CampusEvent::AlertRaised {
            message: message.clone(),
            timestamp: campus_common::time::now(),
        }) {
            Ok(reached) => reached,
            Err(_) => {
                warn!(message = %message, "Alert raised with no subscribers connected");
                0
            }
        }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CampusEvent> {
        self.bus.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn update(space_id: &str, occupancy: u32) -> SpaceUpdate {
        SpaceUpdate {
            space_id: space_id.to_string(),
            occupancy,
            is_ghost: false,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = UpdateBroadcaster::new(Arc::new(EventBus::new(16)));
        assert_eq!(broadcaster.publish(update("S1", 1)), 0);
        assert_eq!(broadcaster.raise_alert("drill"), 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_block_others() {
        let broadcaster = UpdateBroadcaster::new(Arc::new(EventBus::new(16)));
        let mut alive = broadcaster.subscribe();
        let gone = broadcaster.subscribe();
        drop(gone);

        assert_eq!(broadcaster.publish(update("S1", 2)), 1);
        match alive.recv().await.unwrap() {
            CampusEvent::SpaceUpdated(received) => assert_eq!(received.occupancy, 2),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lagging_subscriber_only_loses_its_own_backlog() {
        let broadcaster = UpdateBroadcaster::new(Arc::new(EventBus::new(2)));
        let mut slow = broadcaster.subscribe();
        let mut fast = broadcaster.subscribe();

        for occupancy in 0..4 {
            broadcaster.publish(update("S1", occupancy));
            let CampusEvent::SpaceUpdated(received) = fast.recv().await.unwrap() else {
                panic!("expected SpaceUpdated");
            };
            assert_eq!(received.occupancy, occupancy);
        }

        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
    }

    #[tokio::test]
    async fn test_alert_reaches_subscribers() {
        let broadcaster = UpdateBroadcaster::new(Arc::new(EventBus::new(16)));
        let mut rx = broadcaster.subscribe();

        assert_eq!(broadcaster.raise_alert("Fire drill at 14:00"), 1);
        match rx.recv().await.unwrap() {
            CampusEvent::AlertRaised { message, .. } => assert_eq!(message, "Fire drill at 14:00"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
