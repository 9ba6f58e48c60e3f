use std::process::ExitCode;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use paygate::app::AppConfig;
use paygate::handlers::{router, AppState};
use paygate::queue::PaymentQueue;
use paygate::services::{HttpProcessor, PaymentDispatcher, PROCESSOR_TIMEOUT};
use paygate::storage::PgPaymentRepository;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> paygate::Result<()> {
    let config = AppConfig::from_env()?;
    info!(
        port = config.server.port,
        workers = config.queue.workers,
        buffer_size = config.queue.buffer_size,
        "starting payment pipeline"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.queue.max_simultaneous_writes as u32)
        .connect_with(config.database.connect_options()?)
        .await?;
    sqlx::migrate!().run(&pool).await.map_err(|err| {
        paygate::PaymentError::Config(format!("database migration failed: {err}"))
    })?;

    let repository = Arc::new(PgPaymentRepository::new(pool));
    let primary = Arc::new(HttpProcessor::new(
        "default",
        config.processors.default_url.clone(),
        PROCESSOR_TIMEOUT,
    )?);
    let fallback = Arc::new(HttpProcessor::new(
        "fallback",
        config.processors.fallback_url.clone(),
        PROCESSOR_TIMEOUT,
    )?);

    let dispatcher = Arc::new(PaymentDispatcher::new(
        repository.clone(),
        primary,
        fallback,
        &config.circuit_breaker,
        config.queue.max_simultaneous_writes,
    ));
    let queue = Arc::new(PaymentQueue::new(&config.queue, dispatcher));

    let state = AppState::new(
        queue.clone(),
        repository,
        config.server.service_name.clone(),
    );
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr).await.map_err(|err| {
        paygate::PaymentError::Config(format!("failed to bind {addr}: {err}"))
    })?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| paygate::PaymentError::Config(format!("server error: {err}")))?;

    // In-flight dispatches run to their deadline before we exit.
    queue.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
