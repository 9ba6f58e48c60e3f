pub mod config;

pub use config::{
    AppConfig, CircuitBreakerConfig, DatabaseConfig, ProcessorConfig, QueueConfig, ServerConfig,
};
