use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::error;

use crate::handlers::{error_response, AppState};

#[derive(Deserialize)]
pub struct SummaryQuery {
    from: Option<String>,
    to: Option<String>,
}

/// `GET /payments-summary`: per-processor totals over an optional closed
/// window. Both bounds or neither; timestamps are RFC3339.
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Response {
    let window = match (query.from.as_deref(), query.to.as_deref()) {
        (None, None) => None,
        (Some(from), Some(to)) => {
            let (from, to) = match (parse_timestamp(from), parse_timestamp(to)) {
                (Some(from), Some(to)) => (from, to),
                _ => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        "invalid date format, use RFC3339, e.g. 2025-01-01T00:00:00Z",
                    )
                }
            };
            if from > to {
                return error_response(StatusCode::BAD_REQUEST, "from date cannot be after to date");
            }
            Some((from, to))
        }
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "both from and to dates must be provided",
            )
        }
    };

    match state.repository.summary(window).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => {
            error!(error = %err, "failed to build payment summary");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to retrieve payment summary",
            )
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
