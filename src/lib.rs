//! Payment admission-to-dispatch pipeline.
//!
//! Requests enter through the HTTP ingress, pass a non-blocking bounded
//! queue, and are drained by a worker pool that dispatches each payment
//! through a primary/secondary processor pair guarded by per-processor
//! circuit breakers, then persists the outcome idempotently.

pub mod app;
pub mod error;
pub mod handlers;
pub mod models;
pub mod queue;
pub mod services;
pub mod storage;

pub use error::{PaymentError, Result};
