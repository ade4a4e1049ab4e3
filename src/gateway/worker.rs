use super::job::{Entry, Job};
use super::quota::QuotaWindow;
use crate::config::GatewayConfig;
use crate::error::{IsRetryable, WorkspaceError};
use backon::{ExponentialBuilder, Retryable};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Serialize;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type QueuedJob = Box<dyn Job>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayStats {
    pub minute_count: usize,
    pub day_count: u64,
    pub queue_depth: usize,
    pub daily_remaining: u64,
    pub per_minute_limit: u32,
    pub per_day_limit: u64,
}

/// Quota, retry and courtesy state owned by the worker.
pub(crate) struct Dispatcher {
    quota: Arc<Mutex<QuotaWindow>>,
    retry_policy: ExponentialBuilder,
    courtesy: Option<DefaultDirectRateLimiter>,
}

impl Dispatcher {
    /// Wait for a per-minute slot; an exhausted day fails immediately.
    async fn admit(&self) -> Result<(), WorkspaceError> {
        loop {
            let wait = {
                let mut quota = self.quota.lock().unwrap_or_else(PoisonError::into_inner);
                quota.try_acquire(Instant::now())?
            };
            match wait {
                None => return Ok(()),
                Some(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "Per-minute quota reached; backing off");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    async fn courtesy_pause(&self) {
        if let Some(limiter) = &self.courtesy {
            limiter.until_ready().await;
        }
    }

    /// Run one request under quota and retry policy.
    pub(crate) async fn dispatch<T, F, Fut>(&self, mut request: F) -> Result<T, WorkspaceError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, WorkspaceError>> + Send,
    {
        let attempts = AtomicUsize::new(0);
        let result = (|| {
            attempts.fetch_add(1, Ordering::Relaxed);
            let call = request();
            async move {
                self.admit().await?;
                call.await
            }
        })
        .retry(self.retry_policy)
        .when(|e: &WorkspaceError| e.is_retryable())
        .notify(|err, dur: Duration| {
            warn!(
                error = %err,
                sleep_ms = dur.as_millis() as u64,
                "Gateway request failed; retrying"
            );
        })
        .await;

        match result {
            Err(e) if e.is_retryable() => Err(WorkspaceError::RetriesExhausted {
                attempts: attempts.load(Ordering::Relaxed),
                last: Box::new(e),
            }),
            other => other,
        }
    }
}

/// FIFO request gateway with a single worker.
///
/// Dropping every clone without [`Gateway::cleanup`] detaches the worker; it still drains
/// whatever was queued.
pub struct Gateway {
    tx: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    quota: Arc<Mutex<QuotaWindow>>,
    depth: Arc<AtomicUsize>,
}

impl Gateway {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn new(cfg: &GatewayConfig) -> Self {
        let quota = Arc::new(Mutex::new(QuotaWindow::new(
            cfg.requests_per_minute,
            cfg.requests_per_day,
        )));
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(cfg.initial_delay())
            .with_max_delay(cfg.max_delay())
            .with_max_times(cfg.max_retries);
        let courtesy = Quota::with_period(cfg.courtesy_delay())
            .map(|q| RateLimiter::direct(q.allow_burst(NonZeroU32::MIN)));

        let dispatcher = Dispatcher {
            quota: quota.clone(),
            retry_policy,
            courtesy,
        };
        let depth = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel::<QueuedJob>();

        info!(
            per_minute = cfg.requests_per_minute,
            per_day = cfg.requests_per_day,
            max_retries = cfg.max_retries,
            courtesy_ms = cfg.courtesy_delay_ms,
            "Gateway worker started"
        );
        let worker = tokio::spawn(run_worker(rx, dispatcher, depth.clone()));

        Self {
            tx: Mutex::new(Some(tx)),
            worker: tokio::sync::Mutex::new(Some(worker)),
            quota,
            depth,
        }
    }

    /// Queue `request` and wait for its settled result.
    ///
    /// `request` is invoked once per attempt; each invocation must build a fresh call.
    pub async fn execute<T, F, Fut>(&self, request: F) -> Result<T, WorkspaceError>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, WorkspaceError>> + Send + 'static,
    {
        let (reply, settled) = oneshot::channel();
        let entry: QueuedJob = Box::new(Entry { request, reply });
        {
            let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
            let tx = tx.as_ref().ok_or(WorkspaceError::GatewayClosed)?;
            self.depth.fetch_add(1, Ordering::SeqCst);
            if tx.send(entry).is_err() {
                self.depth.fetch_sub(1, Ordering::SeqCst);
                return Err(WorkspaceError::GatewayClosed);
            }
        }
        settled.await.map_err(|_| WorkspaceError::GatewayClosed)?
    }

    /// Stop accepting work and wait until every queued request has settled.
    pub async fn cleanup(&self) {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(tx);

        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Gateway worker ended abnormally");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn stats(&self) -> GatewayStats {
        let now = Instant::now();
        let mut quota = self.quota.lock().unwrap_or_else(PoisonError::into_inner);
        GatewayStats {
            minute_count: quota.minute_count(now),
            day_count: quota.day_count(now),
            queue_depth: self.depth.load(Ordering::SeqCst),
            daily_remaining: quota.daily_remaining(now),
            per_minute_limit: quota.per_minute(),
            per_day_limit: quota.per_day(),
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    dispatcher: Dispatcher,
    depth: Arc<AtomicUsize>,
) {
    while let Some(job) = rx.recv().await {
        depth.fetch_sub(1, Ordering::SeqCst);
        dispatcher.courtesy_pause().await;
        job.run(&dispatcher).await;
    }
    info!("Gateway worker drained and stopped");
}
