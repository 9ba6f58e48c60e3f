use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::error;

use crate::error::PaymentError;
use crate::handlers::{error_response, AppState};
use crate::models::{Payment, PaymentRequest};

/// `POST /payments`: decode, admit, acknowledge. Admission is wrapped in the
/// 250 ms watchdog; the queue itself only distinguishes accepted from full.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Response {
    let request: PaymentRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "correlationId and amount are required",
            )
        }
    };

    if request.amount <= Decimal::ZERO {
        return error_response(
            StatusCode::BAD_REQUEST,
            &PaymentError::InvalidAmount.to_string(),
        );
    }

    let payment = Payment::from(request);
    let admission = tokio::time::timeout(state.admission_timeout, async {
        state.queue.enqueue(payment)
    })
    .await;

    match admission {
        Ok(Ok(())) => StatusCode::OK.into_response(),
        Ok(Err(PaymentError::QueueFull)) => error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "system is busy, please try again later",
        ),
        Ok(Err(err)) => {
            error!(error = %err, "failed to admit payment");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to admit payment")
        }
        Err(_) => error_response(
            StatusCode::REQUEST_TIMEOUT,
            &PaymentError::AdmissionTimeout.to_string(),
        ),
    }
}
