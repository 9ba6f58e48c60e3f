use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{PaymentError, Result};
use crate::models::{Payment, PaymentSummary, PersistedPayment};
use crate::storage::PaymentRepository;

/// In-memory repository with the same idempotency contract as the Postgres
/// one. Used by unit and integration tests; nothing here survives a restart.
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: DashMap<Uuid, PersistedPayment>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, correlation_id: Uuid) -> Option<PersistedPayment> {
        self.payments.get(&correlation_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Stores a row with an explicit creation time, bypassing idempotency
    /// checks. Lets window tests pin timestamps.
    pub fn insert_at(&self, payment: &Payment, processor: &str, created_at: DateTime<Utc>) {
        self.payments.insert(
            payment.correlation_id,
            PersistedPayment {
                id: Uuid::new_v4(),
                correlation_id: payment.correlation_id,
                amount: payment.amount,
                processor: processor.to_string(),
                created_at,
                updated_at: created_at,
            },
        );
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn persist(&self, payment: &Payment, processor: &str) -> Result<()> {
        let now = Utc::now();
        self.payments
            .entry(payment.correlation_id)
            .or_insert_with(|| PersistedPayment {
                id: Uuid::new_v4(),
                correlation_id: payment.correlation_id,
                amount: payment.amount,
                processor: processor.to_string(),
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn summary(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<PaymentSummary> {
        let mut summary = PaymentSummary::default();
        for entry in self.payments.iter() {
            if let Some((from, to)) = window {
                if entry.created_at < from || entry.created_at > to {
                    continue;
                }
            }
            let bucket = match entry.processor.as_str() {
                "default" => &mut summary.default,
                "fallback" => &mut summary.fallback,
                other => return Err(PaymentError::IntegrityFailure(other.to_string())),
            };
            bucket.total_requests += 1;
            bucket.total_amount += entry.amount;
        }
        Ok(summary)
    }

    async fn purge(&self) -> Result<()> {
        self.payments.clear();
        Ok(())
    }
}
