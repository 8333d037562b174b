//! Server-Sent Events stream of broadcast updates

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use tracing::info;

/// GET /events
///
/// Streams `SpaceUpdated` and `AlertRaised` events published after the
/// client connects. Nothing earlier is replayed.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    info!(
        subscribers = state.broadcaster.subscriber_count(),
        "SSE client connected"
    );
    campus_common::sse::create_event_sse_stream(rx)
}
