use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::handlers::{error_response, AppState};

/// `DELETE /payments-purge`: drops every stored payment. Test reset only.
pub async fn purge_payments(State(state): State<AppState>) -> Response {
    match state.repository.purge().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!(error = %err, "failed to purge payments");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to purge payments")
        }
    }
}
