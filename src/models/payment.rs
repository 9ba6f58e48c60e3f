use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire shape of `POST /payments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub correlation_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// The business record: client-supplied correlation id plus a positive
/// amount. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub correlation_id: Uuid,
    pub amount: Decimal,
}

impl From<PaymentRequest> for Payment {
    fn from(request: PaymentRequest) -> Self {
        Self {
            correlation_id: request.correlation_id,
            amount: request.amount,
        }
    }
}

/// Queue envelope around one payment. The job id exists for logging only;
/// the attempt counter is touched by the worker that owns the job.
#[derive(Debug, Clone)]
pub struct PaymentJob {
    pub id: Uuid,
    pub payment: Payment,
    pub attempts: u32,
    pub created: Instant,
}

impl PaymentJob {
    pub fn new(payment: Payment) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment,
            attempts: 0,
            created: Instant::now(),
        }
    }
}

/// One stored payment row. At most one row exists per correlation id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PersistedPayment {
    pub id: Uuid,
    pub correlation_id: Uuid,
    pub amount: Decimal,
    pub processor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-processor aggregation bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorSummary {
    pub total_requests: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

/// Summary over an optional closed time window. Both buckets are always
/// present, zero-valued when no rows matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub default: ProcessorSummary,
    pub fallback: ProcessorSummary,
}
