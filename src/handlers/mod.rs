pub mod health;
pub mod payments;
pub mod payments_summary;
pub mod purge;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::json;

use crate::queue::PaymentQueue;
use crate::storage::PaymentRepository;

/// Wall-clock watchdog between the enqueue call and its acknowledgement.
pub const ADMISSION_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<PaymentQueue>,
    pub repository: Arc<dyn PaymentRepository>,
    pub service_name: String,
    pub admission_timeout: Duration,
}

impl AppState {
    pub fn new(
        queue: Arc<PaymentQueue>,
        repository: Arc<dyn PaymentRepository>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            repository,
            service_name: service_name.into(),
            admission_timeout: ADMISSION_TIMEOUT,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/payments", post(payments::create_payment))
        .route("/payments-summary", get(payments_summary::get_summary))
        .route("/payments-purge", delete(purge::purge_payments))
        .route("/health", get(health::health_check))
        .with_state(state)
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
