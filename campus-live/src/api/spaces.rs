//! Space and history read endpoints

use crate::model::{BookingWindow, HistoryRecord, LiveState, Space};
use crate::{AppState, Error, Result};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

const DEFAULT_HISTORY_LIMIT: u32 = 50;
const MAX_HISTORY_LIMIT: u32 = 1000;

/// A space with its current live state
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSummary {
    #[serde(flatten)]
    pub space: Space,
    /// Absent until the first accepted reading
    pub live: Option<LiveState>,
}

/// A space with its live state and upcoming bookings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceDetail {
    #[serde(flatten)]
    pub space: Space,
    pub live: Option<LiveState>,
    pub schedule: Vec<BookingWindow>,
    /// The calendar could not be read; `schedule` is empty
    pub calendar_degraded: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// GET /api/spaces
pub async fn list_spaces(State(state): State<AppState>) -> Result<Json<Vec<SpaceSummary>>> {
    let spaces = state.directory.list().await?;

    let mut summaries = Vec::with_capacity(spaces.len());
    for space in spaces {
        let live = state.reconciler.live_state(&space.space_id).await?;
        summaries.push(SpaceSummary { space, live });
    }

    Ok(Json(summaries))
}

/// GET /api/spaces/:id
pub async fn get_space(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
) -> Result<Json<SpaceDetail>> {
    let space = find_space(&state, &space_id).await?;

    let schedule = state
        .reconciler
        .fetch_schedule(&space, campus_common::time::now())
        .await;
    let live = state.reconciler.live_state(&space.space_id).await?;

    Ok(Json(SpaceDetail {
        space,
        live,
        schedule: schedule.bookings,
        calendar_degraded: schedule.degraded,
    }))
}

/// GET /api/spaces/:id/history?limit=N
pub async fn get_space_history(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryRecord>>> {
    let space = find_space(&state, &space_id).await?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let records = state
        .reconciler
        .history()
        .query_recent(&space.space_id, limit)
        .await?;

    Ok(Json(records))
}

async fn find_space(state: &AppState, space_id: &str) -> Result<Space> {
    state
        .directory
        .get(space_id)
        .await?
        .ok_or_else(|| Error::SpaceNotFound(space_id.to_string()))
}
