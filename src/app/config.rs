use std::env;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::error::{PaymentError, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub processors: ProcessorConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub workers: usize,
    pub buffer_size: usize,
    pub max_enqueue_retries: u32,
    pub max_simultaneous_writes: usize,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Deadline for one whole dispatch (rate-limit wait, both processor
    /// attempts, persist).
    pub timeout: Duration,
    pub max_failures: u32,
    pub reset_timeout: Duration,
    pub rate_limit: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub default_url: String,
    pub fallback_url: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub sslmode: String,
    pub timezone: String,
}

impl AppConfig {
    /// Loads every setting from the environment, applying the documented
    /// defaults, then validates the result.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig {
                port: parse_env("APP_PORT", "9999")?,
                service_name: env_or_default("HOSTNAME", "paygate"),
            },
            queue: QueueConfig {
                workers: parse_env("QUEUE_WORKERS", "10")?,
                buffer_size: parse_env("QUEUE_BUFFER_SIZE", "10000")?,
                max_enqueue_retries: parse_env("QUEUE_MAX_ENQUEUE_RETRIES", "4")?,
                max_simultaneous_writes: parse_env("QUEUE_MAX_SIMULTANEOUS_WRITES", "50")?,
            },
            circuit_breaker: CircuitBreakerConfig {
                timeout: duration_env("CIRCUIT_BREAKER_TIMEOUT", "1s")?,
                max_failures: parse_env("CIRCUIT_BREAKER_MAX_FAILURES", "5")?,
                reset_timeout: duration_env("CIRCUIT_BREAKER_RESET_TIMEOUT", "10s")?,
                rate_limit: parse_env("CIRCUIT_BREAKER_RATE_LIMIT", "5")?,
            },
            processors: ProcessorConfig {
                default_url: env_or_default("DEFAULT_PROCESSOR_URL", ""),
                fallback_url: env_or_default("FALLBACK_PROCESSOR_URL", ""),
            },
            database: DatabaseConfig {
                host: env_or_default("POSTGRES_HOST", "localhost"),
                port: parse_env("POSTGRES_PORT", "5432")?,
                user: env_or_default("POSTGRES_USER", "postgres"),
                password: env_or_default("POSTGRES_PASSWORD", ""),
                database: env_or_default("POSTGRES_DB", "payments"),
                sslmode: env_or_default("POSTGRES_SSLMODE", "disable"),
                timezone: env_or_default("POSTGRES_TIMEZONE", "UTC"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue.workers == 0 {
            return Err(config_error("QUEUE_WORKERS must be greater than 0"));
        }
        if self.queue.buffer_size == 0 {
            return Err(config_error("QUEUE_BUFFER_SIZE must be greater than 0"));
        }
        if self.queue.max_simultaneous_writes == 0 {
            return Err(config_error(
                "QUEUE_MAX_SIMULTANEOUS_WRITES must be greater than 0",
            ));
        }
        if self.circuit_breaker.max_failures == 0 {
            return Err(config_error(
                "CIRCUIT_BREAKER_MAX_FAILURES must be greater than 0",
            ));
        }
        if self.circuit_breaker.timeout.is_zero() {
            return Err(config_error("CIRCUIT_BREAKER_TIMEOUT must be greater than 0"));
        }
        if self.circuit_breaker.reset_timeout.is_zero() {
            return Err(config_error(
                "CIRCUIT_BREAKER_RESET_TIMEOUT must be greater than 0",
            ));
        }
        if self.circuit_breaker.rate_limit == 0 {
            return Err(config_error("CIRCUIT_BREAKER_RATE_LIMIT must be greater than 0"));
        }
        if self.processors.default_url.is_empty() {
            return Err(config_error("DEFAULT_PROCESSOR_URL is required"));
        }
        if self.processors.fallback_url.is_empty() {
            return Err(config_error("FALLBACK_PROCESSOR_URL is required"));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let ssl_mode = PgSslMode::from_str(&self.sslmode)
            .map_err(|err| PaymentError::Config(format!("invalid POSTGRES_SSLMODE: {err}")))?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(ssl_mode)
            .options([("TimeZone", self.timezone.as_str())]))
    }
}

fn config_error(message: &str) -> PaymentError {
    PaymentError::Config(message.to_string())
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    env_or_default(key, default)
        .parse()
        .map_err(|err| PaymentError::Config(format!("invalid {key}: {err}")))
}

fn duration_env(key: &str, default: &str) -> Result<Duration> {
    let raw = env_or_default(key, default);
    parse_duration(&raw).ok_or_else(|| {
        PaymentError::Config(format!(
            "invalid {key}: expected a duration like \"10s\" or \"250ms\", got {raw:?}"
        ))
    })
}

/// Accepts `"500ms"`, `"10s"`, or a bare number of seconds.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Some(millis) = value.strip_suffix("ms") {
        return millis.trim().parse().ok().map(Duration::from_millis);
    }
    if let Some(secs) = value.strip_suffix('s') {
        return secs.trim().parse().ok().map(Duration::from_secs);
    }
    value.parse().ok().map(Duration::from_secs)
}
