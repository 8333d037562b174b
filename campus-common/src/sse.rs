//! Server-Sent Events (SSE) utilities
//!
//! Turns an EventBus subscription into an axum SSE response.

use crate::events::CampusEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Convert one campus event into an SSE frame
///
/// The SSE `event:` field carries the event type, `data:` the JSON payload.
pub fn to_sse_event(event: &CampusEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Create an SSE stream from an EventBus receiver
///
/// A receiver that falls behind skips the dropped events and keeps streaming.
pub fn create_event_sse_stream(
    rx: broadcast::Receiver<CampusEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                debug!("Streaming SSE event: {}", event.event_type());
                to_sse_event(&event).map(Ok)
            }
            Err(e) => {
                // Lagged receiver; the skipped events are gone
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
