use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::app::CircuitBreakerConfig;
use crate::error::{PaymentError, Result};
use crate::models::Payment;
use crate::services::circuit_breaker::CircuitBreaker;
use crate::services::processor::Processor;
use crate::services::rate_limiter::RateLimiter;
use crate::storage::PaymentRepository;

/// The queue's view of dispatching: one payment in, one terminal outcome out.
#[async_trait]
pub trait DispatchService: Send + Sync {
    async fn process(&self, payment: &Payment) -> Result<()>;
}

/// Orchestrates one dispatch: rate-limiter slot, primary attempt behind its
/// breaker, fallback attempt behind its own breaker, idempotent persist with
/// the name of the processor that accepted.
pub struct PaymentDispatcher {
    repository: Arc<dyn PaymentRepository>,
    primary: Arc<dyn Processor>,
    fallback: Arc<dyn Processor>,
    primary_breaker: CircuitBreaker,
    fallback_breaker: CircuitBreaker,
    limiter: RateLimiter,
    dispatch_timeout: Duration,
}

impl PaymentDispatcher {
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        primary: Arc<dyn Processor>,
        fallback: Arc<dyn Processor>,
        breaker_config: &CircuitBreakerConfig,
        max_simultaneous_writes: usize,
    ) -> Self {
        Self {
            repository,
            primary,
            fallback,
            primary_breaker: CircuitBreaker::new(
                breaker_config.max_failures,
                breaker_config.reset_timeout,
            ),
            fallback_breaker: CircuitBreaker::new(
                breaker_config.max_failures,
                breaker_config.reset_timeout,
            ),
            limiter: RateLimiter::new(max_simultaneous_writes),
            dispatch_timeout: breaker_config.timeout,
        }
    }

    async fn dispatch(&self, payment: &Payment) -> Result<()> {
        match self
            .attempt(self.primary.as_ref(), &self.primary_breaker, payment)
            .await
        {
            Ok(()) => {
                debug!(
                    correlation_id = %payment.correlation_id,
                    processor = self.primary.name(),
                    "payment accepted"
                );
                self.repository
                    .persist(payment, self.primary.name())
                    .await
            }
            Err(primary_err) => {
                warn!(
                    correlation_id = %payment.correlation_id,
                    error = %primary_err,
                    "default processor failed, trying fallback"
                );

                match self
                    .attempt(self.fallback.as_ref(), &self.fallback_breaker, payment)
                    .await
                {
                    Ok(()) => {
                        debug!(
                            correlation_id = %payment.correlation_id,
                            processor = self.fallback.name(),
                            "payment accepted"
                        );
                        self.repository
                            .persist(payment, self.fallback.name())
                            .await
                    }
                    Err(fallback_err) => Err(PaymentError::AllProcessorsFailed {
                        primary: Box::new(primary_err),
                        fallback: Box::new(fallback_err),
                    }),
                }
            }
        }
    }

    /// A refusal without a transport error still counts against the breaker:
    /// it is a semantic failure of the downstream.
    async fn attempt(
        &self,
        processor: &dyn Processor,
        breaker: &CircuitBreaker,
        payment: &Payment,
    ) -> Result<()> {
        breaker
            .call(|| async {
                match processor.process(payment).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(PaymentError::ProcessingFailed),
                    Err(err) => Err(err),
                }
            })
            .await
    }
}

#[async_trait]
impl DispatchService for PaymentDispatcher {
    async fn process(&self, payment: &Payment) -> Result<()> {
        let dispatch = self.limiter.with_permit(|| self.dispatch(payment));

        match tokio::time::timeout(self.dispatch_timeout, dispatch).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::Cancelled),
        }
    }
}
