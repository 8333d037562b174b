//! campus-live library - live occupancy core
//!
//! Telemetry Ingest routes each sensor reading to its space; the State
//! Reconciler combines it with the space's calendar snapshot, replaces the
//! live state and hands the result to the History Recorder and the Update
//! Broadcaster.

use axum::Router;
use campus_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod broadcaster;
pub mod calendar;
pub mod db;
pub mod error;
pub mod history;
pub mod ingest;
pub mod model;
pub mod reconciler;
pub mod state;

pub use error::{Error, Result};

use broadcaster::UpdateBroadcaster;
use calendar::CalendarProvider;
use db::{SpaceDirectory, SqliteHistoryStore, SqliteSpaceStore};
use history::HistoryRecorder;
use ingest::TelemetryIngest;
use reconciler::{Reconciler, ReconcilerSettings};
use state::LiveStateStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<TelemetryIngest>,
    pub reconciler: Arc<Reconciler>,
    pub directory: Arc<dyn SpaceDirectory>,
    pub broadcaster: UpdateBroadcaster,
}

impl AppState {
    /// Wire the core over one SQLite pool
    pub fn new(
        db: SqlitePool,
        calendar: Arc<dyn CalendarProvider>,
        bus: Arc<EventBus>,
        settings: ReconcilerSettings,
    ) -> Self {
        let spaces = Arc::new(SqliteSpaceStore::new(db.clone()));
        let store = Arc::new(LiveStateStore::new(spaces.clone()));
        let history = HistoryRecorder::new(
            Arc::new(SqliteHistoryStore::new(db)),
            settings.history_policy,
            settings.offset,
        );
        let broadcaster = UpdateBroadcaster::new(bus);

        let reconciler = Arc::new(Reconciler::new(
            calendar,
            store,
            history,
            broadcaster.clone(),
            settings,
        ));
        let directory: Arc<dyn SpaceDirectory> = spaces;
        let ingest = Arc::new(TelemetryIngest::new(directory.clone(), reconciler.clone()));

        Self {
            ingest,
            reconciler,
            directory,
            broadcaster,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/telemetry", post(api::post_telemetry))
        .route("/api/spaces", get(api::list_spaces))
        .route("/api/spaces/:id", get(api::get_space))
        .route("/api/spaces/:id/history", get(api::get_space_history))
        .route("/api/alerts", post(api::post_alert))
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
