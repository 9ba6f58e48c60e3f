use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{PaymentError, Result};
use crate::models::Payment;

/// Default per-request timeout for processor calls.
pub const PROCESSOR_TIMEOUT: Duration = Duration::from_secs(5);

/// One outbound payment capability. `Ok(true)` means the processor accepted
/// the payment; `Ok(false)` is a refusal without a transport error, which
/// the dispatcher treats as a failure of the downstream.
#[async_trait]
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, payment: &Payment) -> Result<bool>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessorPayload {
    correlation_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

/// Canonical processor: POSTs the payment as JSON to `<url>/payments`.
pub struct HttpProcessor {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpProcessor {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PaymentError::Config(format!("failed to build HTTP client: {err}")))?;

        Self::with_client(name, url, client)
    }

    pub fn with_client(
        name: impl Into<String>,
        url: impl Into<String>,
        client: reqwest::Client,
    ) -> Result<Self> {
        let name = name.into();
        let url = url.into();
        if url.is_empty() {
            return Err(PaymentError::Config(format!(
                "processor {name} has no URL configured"
            )));
        }
        Ok(Self { name, url, client })
    }
}

#[async_trait]
impl Processor for HttpProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, payment: &Payment) -> Result<bool> {
        let payload = ProcessorPayload {
            correlation_id: payment.correlation_id,
            amount: payment.amount,
        };

        let response = self
            .client
            .post(format!("{}/payments", self.url))
            .json(&payload)
            .send()
            .await
            .map_err(|source| PaymentError::ProcessorUnreachable {
                processor: self.name.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::ProcessorRejected {
                processor: self.name.clone(),
                status: status.as_u16(),
            });
        }

        Ok(true)
    }
}
