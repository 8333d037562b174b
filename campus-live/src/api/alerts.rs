//! Operator alerts

use crate::{AppState, Result};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct AlertRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    /// Subscribers connected when the alert was published
    pub delivered: usize,
}

/// POST /api/alerts
pub async fn post_alert(
    State(state): State<AppState>,
    Json(request): Json<AlertRequest>,
) -> Result<Json<AlertResponse>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(campus_common::Error::InvalidInput("message must not be empty".to_string()).into());
    }

    let delivered = state.broadcaster.raise_alert(message);
    info!(delivered, "Alert raised");

    Ok(Json(AlertResponse { delivered }))
}
