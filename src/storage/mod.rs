pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Payment, PaymentSummary};

pub use memory::InMemoryPaymentRepository;
pub use postgres::PgPaymentRepository;

/// Storage port for payments. `persist` is idempotent on correlation id;
/// replaying a payment leaves the stored row untouched and succeeds.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn persist(&self, payment: &Payment, processor: &str) -> Result<()>;

    /// Aggregates per processor. `window` is a closed `[from, to]` range;
    /// `None` means everything. Half-open ranges are rejected at the ingress
    /// and never reach this layer.
    async fn summary(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<PaymentSummary>;

    /// Unconditionally deletes all rows. Test reset only.
    async fn purge(&self) -> Result<()>;
}
