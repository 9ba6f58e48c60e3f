use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PaymentError, Result};
use crate::models::{Payment, PaymentSummary, ProcessorSummary};
use crate::storage::PaymentRepository;

const MAX_PERSIST_ATTEMPTS: u32 = 3;
const PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Driver error fragments that identify transient cross-transaction
/// contention worth retrying.
const CONTENTION_PATTERNS: [&str; 3] = [
    "deadlock detected",
    "could not serialize access",
    "concurrent update",
];

/// Postgres-backed repository. Idempotency comes from the SELECT-then-INSERT
/// transaction keyed by correlation id; the unique index on correlation_id
/// backstops concurrent writers.
pub struct PgPaymentRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    processor: String,
    total_requests: i64,
    total_amount: Decimal,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn persist_once(&self, payment: &Payment, processor: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;

        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM payments WHERE correlation_id = $1 LIMIT 1")
                .bind(payment.correlation_id)
                .fetch_optional(&mut *tx)
                .await?;

        // Already stored: the replay is a no-op, first writer wins.
        if existing.is_some() {
            tx.commit().await?;
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO payments (id, correlation_id, amount, processor, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(payment.correlation_id)
        .bind(payment.amount)
        .bind(processor)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn persist(&self, payment: &Payment, processor: &str) -> Result<()> {
        let mut attempt = 1;
        loop {
            let outcome = tokio::time::timeout(
                PERSIST_TIMEOUT,
                self.persist_once(payment, processor),
            )
            .await
            .unwrap_or(Err(PaymentError::Cancelled));

            match outcome {
                Ok(()) => return Ok(()),
                Err(PaymentError::Storage(err)) if is_contention(&err) => {
                    if attempt >= MAX_PERSIST_ATTEMPTS {
                        return Err(PaymentError::Contention {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    let backoff = contention_backoff(attempt);
                    debug!(
                        correlation_id = %payment.correlation_id,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "storage contention, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn summary(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<PaymentSummary> {
        let query = match window {
            Some((from, to)) => sqlx::query_as::<_, SummaryRow>(
                "SELECT processor, COUNT(*) AS total_requests, SUM(amount) AS total_amount \
                 FROM payments WHERE created_at BETWEEN $1 AND $2 GROUP BY processor",
            )
            .bind(from)
            .bind(to),
            None => sqlx::query_as::<_, SummaryRow>(
                "SELECT processor, COUNT(*) AS total_requests, SUM(amount) AS total_amount \
                 FROM payments GROUP BY processor",
            ),
        };

        let rows = query.fetch_all(&self.pool).await?;

        let mut summary = PaymentSummary::default();
        for row in rows {
            let bucket = ProcessorSummary {
                total_requests: row.total_requests,
                total_amount: row.total_amount,
            };
            match row.processor.as_str() {
                "default" => summary.default = bucket,
                "fallback" => summary.fallback = bucket,
                other => return Err(PaymentError::IntegrityFailure(other.to_string())),
            }
        }
        Ok(summary)
    }

    async fn purge(&self) -> Result<()> {
        sqlx::query("DELETE FROM payments")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Exponential backoff of the retry ladder: 100 ms, 400 ms, 900 ms.
fn contention_backoff(attempt: u32) -> Duration {
    Duration::from_millis(100 * u64::from(attempt * attempt))
}

fn is_contention(err: &sqlx::Error) -> bool {
    let message = err
        .as_database_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| err.to_string());
    CONTENTION_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}
