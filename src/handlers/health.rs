use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::handlers::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    service: String,
    time: String,
}

/// `GET /health`: liveness only, available even while shutting down.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: state.service_name.clone(),
        time: Utc::now().to_rfc3339(),
    })
}
