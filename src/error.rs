//! Error types for the payment pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors surfaced by the admission-to-dispatch pipeline.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Admission-time overflow of the bounded queue
    #[error("payment queue is full")]
    QueueFull,

    /// Admission attempted after shutdown was signalled
    #[error("payment queue is shut down")]
    QueueClosed,

    /// Ingress watchdog fired before the queue acknowledged admission
    #[error("payment admission timed out")]
    AdmissionTimeout,

    /// Fast-fail from an open circuit breaker
    #[error("circuit breaker is open")]
    BreakerOpen,

    /// The processor refused the payment without a transport error
    #[error("payment processing failed")]
    ProcessingFailed,

    /// The processor answered with a non-2xx status
    #[error("processor {processor} rejected the payment: HTTP {status}")]
    ProcessorRejected { processor: String, status: u16 },

    /// The request never reached the processor
    #[error("request to processor {processor} failed: {source}")]
    ProcessorUnreachable {
        processor: String,
        #[source]
        source: reqwest::Error,
    },

    /// Both dispatch legs failed for one payment
    #[error("both processors failed (default: {primary}; fallback: {fallback})")]
    AllProcessorsFailed {
        primary: Box<PaymentError>,
        fallback: Box<PaymentError>,
    },

    /// Storage contention that survived every retry attempt
    #[error("storage contention persisted after {attempts} attempts: {source}")]
    Contention {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// Non-contention storage error
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// A persisted row names a processor the system does not know
    #[error("unknown processor name in storage: {0}")]
    IntegrityFailure(String),

    /// Deadline or cancellation cut the operation short
    #[error("operation cancelled or timed out")]
    Cancelled,

    /// Amounts must be strictly positive
    #[error("amount must be greater than zero")]
    InvalidAmount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_error_names_both_legs() {
        let err = PaymentError::AllProcessorsFailed {
            primary: Box::new(PaymentError::BreakerOpen),
            fallback: Box::new(PaymentError::ProcessorRejected {
                processor: "fallback".to_string(),
                status: 500,
            }),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("circuit breaker is open"));
        assert!(rendered.contains("HTTP 500"));
    }

    #[test]
    fn queue_errors_are_distinct() {
        assert!(!matches!(PaymentError::QueueFull, PaymentError::QueueClosed));
    }
}
