pub mod circuit_breaker;
pub mod dispatcher;
pub mod processor;
pub mod rate_limiter;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use dispatcher::{DispatchService, PaymentDispatcher};
pub use processor::{HttpProcessor, Processor, PROCESSOR_TIMEOUT};
pub use rate_limiter::RateLimiter;
