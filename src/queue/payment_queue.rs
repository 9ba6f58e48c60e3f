use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::QueueConfig;
use crate::error::{PaymentError, Result};
use crate::models::{Payment, PaymentJob};
use crate::services::DispatchService;

/// Upper bound on one worker's commitment to a job, even when the dispatch
/// deadline inside it is extended.
const JOB_TIMEOUT: Duration = Duration::from_secs(5);

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<PaymentJob>>>;

/// Bounded FIFO of payment jobs drained by a pool of long-lived workers.
///
/// Admission never blocks: a full buffer is reported as `QueueFull`
/// immediately. Failed dispatches are re-admitted by detached backoff timers
/// until their retry budget runs out.
pub struct PaymentQueue {
    sender: mpsc::Sender<PaymentJob>,
    shutdown: CancellationToken,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl PaymentQueue {
    pub fn new(config: &QueueConfig, service: Arc<dyn DispatchService>) -> Self {
        let (sender, receiver) = mpsc::channel(config.buffer_size);
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let shutdown = CancellationToken::new();

        let workers = (0..config.workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(WorkerContext {
                    worker_id,
                    receiver: receiver.clone(),
                    sender: sender.clone(),
                    service: service.clone(),
                    shutdown: shutdown.clone(),
                    max_retries: config.max_enqueue_retries,
                }))
            })
            .collect();

        Self {
            sender,
            shutdown,
            workers: std::sync::Mutex::new(workers),
        }
    }

    /// Offers the payment to the buffer and returns immediately.
    pub fn enqueue(&self, payment: Payment) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(PaymentError::QueueClosed);
        }

        match self.sender.try_send(PaymentJob::new(payment)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(PaymentError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(PaymentError::QueueClosed),
        }
    }

    /// Signals every worker to stop and waits for them to return. Jobs being
    /// dispatched run to their deadline; jobs still buffered are abandoned.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let workers: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        for handle in workers {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker terminated abnormally");
            }
        }
        info!("payment queue drained");
    }
}

struct WorkerContext {
    worker_id: usize,
    receiver: SharedReceiver,
    sender: mpsc::Sender<PaymentJob>,
    service: Arc<dyn DispatchService>,
    shutdown: CancellationToken,
    max_retries: u32,
}

async fn worker_loop(ctx: WorkerContext) {
    loop {
        let job = tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            job = recv_next(&ctx.receiver) => match job {
                Some(job) => job,
                None => break,
            },
        };
        run_job(&ctx, job).await;
    }
    debug!(worker_id = ctx.worker_id, "worker stopped");
}

async fn recv_next(receiver: &SharedReceiver) -> Option<PaymentJob> {
    receiver.lock().await.recv().await
}

async fn run_job(ctx: &WorkerContext, mut job: PaymentJob) {
    debug!(
        worker_id = ctx.worker_id,
        job_id = %job.id,
        attempt = job.attempts,
        "processing job"
    );

    let outcome = match tokio::time::timeout(JOB_TIMEOUT, ctx.service.process(&job.payment)).await
    {
        Ok(result) => result,
        Err(_) => Err(PaymentError::Cancelled),
    };

    match outcome {
        Ok(()) => {
            info!(
                worker_id = ctx.worker_id,
                job_id = %job.id,
                correlation_id = %job.payment.correlation_id,
                elapsed_ms = job.created.elapsed().as_millis() as u64,
                "job processed"
            );
        }
        Err(err) => {
            job.attempts += 1;
            if job.attempts < ctx.max_retries {
                schedule_retry(ctx, job, &err);
            } else {
                error!(
                    worker_id = ctx.worker_id,
                    job_id = %job.id,
                    correlation_id = %job.payment.correlation_id,
                    attempts = job.attempts,
                    error = %err,
                    "job dropped after final attempt"
                );
            }
        }
    }
}

/// Re-admits the job after its backoff without holding a worker. The timer
/// aborts when shutdown is signalled; the delayed send races fresh
/// admissions and gets no priority.
fn schedule_retry(ctx: &WorkerContext, job: PaymentJob, err: &PaymentError) {
    let backoff = retry_backoff(job.attempts);
    warn!(
        worker_id = ctx.worker_id,
        job_id = %job.id,
        attempt = job.attempts,
        error = %err,
        backoff_secs = backoff.as_secs(),
        "dispatch failed, scheduling retry"
    );

    let sender = ctx.sender.clone();
    let shutdown = ctx.shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(backoff) => {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    sent = sender.send(job) => {
                        if sent.is_err() {
                            warn!("queue closed before a retry could be re-admitted");
                        }
                    }
                }
            }
        }
    });
}

/// 1 s, 2 s, 4 s, ... for the first, second, third retry.
fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(16))
}
