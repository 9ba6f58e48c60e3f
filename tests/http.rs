//! Ingress contract tests: status mapping and wire shapes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_decimal_macros::dec;
use tower::util::ServiceExt;

use paygate::app::{CircuitBreakerConfig, QueueConfig};
use paygate::handlers::{router, AppState};
use paygate::models::Payment;
use paygate::queue::PaymentQueue;
use paygate::services::{PaymentDispatcher, Processor};
use paygate::storage::{InMemoryPaymentRepository, PaymentRepository};
use paygate::Result;

struct AcceptingProcessor(&'static str);

#[async_trait]
impl Processor for AcceptingProcessor {
    fn name(&self) -> &str {
        self.0
    }

    async fn process(&self, _payment: &Payment) -> Result<bool> {
        Ok(true)
    }
}

fn test_app() -> (Router, Arc<InMemoryPaymentRepository>, Arc<PaymentQueue>) {
    let repository = Arc::new(InMemoryPaymentRepository::new());
    let dispatcher = Arc::new(PaymentDispatcher::new(
        repository.clone(),
        Arc::new(AcceptingProcessor("default")),
        Arc::new(AcceptingProcessor("fallback")),
        &CircuitBreakerConfig {
            timeout: Duration::from_secs(1),
            max_failures: 5,
            reset_timeout: Duration::from_secs(10),
            rate_limit: 5,
        },
        50,
    ));
    let queue = Arc::new(PaymentQueue::new(
        &QueueConfig {
            workers: 2,
            buffer_size: 64,
            max_enqueue_retries: 4,
            max_simultaneous_writes: 50,
        },
        dispatcher,
    ));
    let state = AppState::new(queue.clone(), repository.clone(), "paygate-test");
    (router(state), repository, queue)
}

fn post_payment(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/payments")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for(description: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {description}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn valid_payment_is_accepted_and_processed() {
    let (app, repository, queue) = test_app();

    let response = app
        .oneshot(post_payment(
            r#"{"correlationId":"11111111-1111-1111-1111-111111111111","amount":12.50}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    wait_for("payment to persist", || repository.len() == 1).await;
    let stored = repository
        .get("11111111-1111-1111-1111-111111111111".parse().unwrap())
        .unwrap();
    assert_eq!(stored.amount, dec!(12.50));
    assert_eq!(stored.processor, "default");

    queue.shutdown().await;
}

#[tokio::test]
async fn malformed_payloads_are_rejected_with_400() {
    let (app, repository, _queue) = test_app();

    for body in [
        "not json at all",
        r#"{"amount":12.50}"#,
        r#"{"correlationId":"not-a-uuid","amount":1}"#,
        r#"{"correlationId":"11111111-1111-1111-1111-111111111111"}"#,
    ] {
        let response = app.clone().oneshot(post_payment(body)).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 for body {body:?}"
        );
    }

    assert!(repository.is_empty());
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let (app, repository, _queue) = test_app();

    for body in [
        r#"{"correlationId":"11111111-1111-1111-1111-111111111111","amount":0}"#,
        r#"{"correlationId":"11111111-1111-1111-1111-111111111111","amount":-3.5}"#,
    ] {
        let response = app.clone().oneshot(post_payment(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    assert!(repository.is_empty());
}

#[tokio::test]
async fn summary_returns_both_buckets() {
    let (app, repository, _queue) = test_app();
    repository
        .persist(
            &Payment {
                correlation_id: uuid::Uuid::new_v4(),
                amount: dec!(12.50),
            },
            "default",
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/payments-summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["default"]["totalRequests"], 1);
    assert_eq!(value["default"]["totalAmount"], 12.5);
    assert_eq!(value["fallback"]["totalRequests"], 0);
    assert_eq!(value["fallback"]["totalAmount"], 0.0);
}

#[tokio::test]
async fn summary_rejects_half_open_and_invalid_windows() {
    let (app, _repository, _queue) = test_app();

    for uri in [
        "/payments-summary?from=2025-01-01T00:00:00Z",
        "/payments-summary?to=2025-01-01T00:00:00Z",
        "/payments-summary?from=yesterday&to=today",
        "/payments-summary?from=2025-01-02T00:00:00Z&to=2025-01-01T00:00:00Z",
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 for {uri}"
        );
    }
}

#[tokio::test]
async fn summary_honours_a_valid_window() {
    let (app, repository, _queue) = test_app();
    repository
        .persist(
            &Payment {
                correlation_id: uuid::Uuid::new_v4(),
                amount: dec!(5),
            },
            "fallback",
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/payments-summary?from=2000-01-01T00:00:00Z&to=2100-01-01T00:00:00Z")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["fallback"]["totalRequests"], 1);
    assert_eq!(value["fallback"]["totalAmount"], 5.0);
}

#[tokio::test]
async fn purge_empties_storage_and_returns_no_content() {
    let (app, repository, _queue) = test_app();
    repository
        .persist(
            &Payment {
                correlation_id: uuid::Uuid::new_v4(),
                amount: dec!(1),
            },
            "default",
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/payments-purge")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(repository.is_empty());
}

#[tokio::test]
async fn health_reports_service_and_time() {
    let (app, _repository, _queue) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["service"], "paygate-test");
    assert!(value["time"].as_str().unwrap().contains('T'));
}
