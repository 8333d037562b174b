//! Inbound telemetry endpoint

use crate::ingest::validate_person_count;
use crate::model::{IngestOutcome, TelemetryReading};
use crate::{AppState, Result};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Body of `POST /api/telemetry`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRequest {
    #[serde(alias = "cameraId")]
    pub sensor_id: String,
    pub person_count: i64,
    /// Reading time; receipt time when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// POST /api/telemetry
pub async fn post_telemetry(
    State(state): State<AppState>,
    Json(request): Json<TelemetryRequest>,
) -> Result<Json<IngestOutcome>> {
    let person_count = validate_person_count(request.person_count)?;
    let reading = TelemetryReading::new(
        request.sensor_id,
        person_count,
        request.timestamp.unwrap_or_else(campus_common::time::now),
    );

    let outcome = state.ingest.ingest(reading).await?;
    Ok(Json(outcome))
}
