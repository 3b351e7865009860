//! Job lifecycle manager: submission, background dispatch, status queries
//! and input hand-off.
//!
//! Each accepted job gets its own tokio task. A semaphore bounds how many
//! run the executor at once; jobs waiting for a permit stay `queued`.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::model::{InputData, Job};
use super::prompt::compose_prompt;
use super::state::JobStatus;
use super::store::{JobPage, JobStore, mutation};
use crate::error::{ExecutionError, JobError, ValidationError};
use crate::executor::{ExecutionContext, InputWaiters, TaskExecutor};
use crate::schema::{InputField, ValidationMode, validate_with};

/// Default number of jobs allowed to execute at once.
pub const DEFAULT_MAX_PARALLEL_JOBS: usize = 10;

/// Tracked job handle.
#[derive(Debug)]
struct TrackedJob {
    handle: JoinHandle<()>,
}

/// Point-in-time counters for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// Jobs currently running.
    pub active_jobs: usize,
    pub total_jobs: usize,
    pub queued_jobs: usize,
    pub waiting_for_input: usize,
}

/// Orchestrates the job store and the task executor.
pub struct LifecycleManager {
    store: Arc<dyn JobStore>,
    executor: Arc<dyn TaskExecutor>,
    schema: Arc<Vec<InputField>>,
    validation: ValidationMode,
    permits: Arc<Semaphore>,
    /// In-flight job tasks, kept so they can be aborted on shutdown.
    jobs: Arc<RwLock<HashMap<Uuid, TrackedJob>>>,
    waiters: Arc<InputWaiters>,
}

impl LifecycleManager {
    /// Create a new manager.
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn TaskExecutor>,
        schema: Vec<InputField>,
    ) -> Self {
        Self {
            store,
            executor,
            schema: Arc::new(schema),
            validation: ValidationMode::default(),
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_PARALLEL_JOBS)),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            waiters: Arc::new(InputWaiters::new()),
        }
    }

    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    pub fn with_max_parallel_jobs(mut self, max: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    /// The declared input schema.
    pub fn schema(&self) -> &[InputField] {
        &self.schema
    }

    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    /// Validate `input`, store a queued job, and start executing it in the
    /// background. Returns as soon as the job record exists.
    pub async fn submit(
        &self,
        input: InputData,
        payment_id: Option<String>,
    ) -> Result<Uuid, ValidationError> {
        if let Err(e) = validate_with(self.validation, &self.schema, &input) {
            warn!(error = %e, "Rejected job submission");
            return Err(e);
        }

        let job = self.store.create(input, payment_id).await;
        let job_id = job.job_id;
        info!(job_id = %job_id, "Job queued");

        self.dispatch(job).await;
        Ok(job_id)
    }

    async fn dispatch(&self, job: Job) {
        let job_id = job.job_id;
        let store = Arc::clone(&self.store);
        let executor = Arc::clone(&self.executor);
        let waiters = Arc::clone(&self.waiters);
        let permits = Arc::clone(&self.permits);
        let jobs = Arc::clone(&self.jobs);

        // Hold the write lock across spawn + insert so the task's own
        // removal can never run before its insertion.
        let mut tracked = self.jobs.write().await;
        let handle = tokio::spawn(async move {
            match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => {
                    let ctx = ExecutionContext::new(job_id, Arc::clone(&store), waiters)
                        .with_worker_slot(permits, permit);
                    execute(store, executor, ctx, job).await
                }
                Err(e) => error!(job_id = %job_id, error = %e, "Worker pool closed"),
            }
            jobs.write().await.remove(&job_id);
        });
        tracked.insert(job_id, TrackedJob { handle });
    }

    /// Snapshot of a job.
    pub async fn get_status(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.store.get(job_id).await
    }

    /// Supply extra input to a job paused in `waiting_for_input` and resume
    /// it. Any other status is rejected without touching the job.
    pub async fn provide_input(&self, job_id: Uuid, extra: InputData) -> Result<(), JobError> {
        let merged = extra.clone();
        let job = self
            .store
            .update(job_id, mutation(move |job| job.resume(merged)))
            .await
            .inspect_err(|e| warn!(job_id = %job_id, error = %e, "Rejected provide_input"))?;

        if self.waiters.deliver(job_id, extra).await {
            info!(job_id = %job_id, "Input delivered, job resumed");
        } else {
            debug!(job_id = %job_id, status = %job.status, "Input stored, no paused execution");
        }
        Ok(())
    }

    /// Newest-first jobs, optionally filtered by status.
    pub async fn list_jobs(&self, status: Option<JobStatus>, limit: usize) -> JobPage {
        self.store.list(status, limit).await
    }

    pub async fn health(&self) -> HealthSnapshot {
        let counts = self.store.status_counts().await;
        HealthSnapshot {
            active_jobs: counts.running,
            total_jobs: counts.total(),
            queued_jobs: counts.queued,
            waiting_for_input: counts.waiting_for_input,
        }
    }

    /// Check if a job's background task is still alive.
    pub async fn is_tracked(&self, job_id: Uuid) -> bool {
        self.jobs.read().await.contains_key(&job_id)
    }

    /// Number of job tasks still alive.
    pub async fn tracked_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Drop terminal jobs that finished more than `retention` ago.
    pub async fn purge_expired(&self, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let removed = self
            .store
            .purge_finished_before(chrono::Utc::now() - retention)
            .await;
        if removed > 0 {
            info!(count = removed, "Purged expired jobs");
        }
        removed
    }

    /// Abort every in-flight job task. Used on process shutdown.
    pub async fn shutdown(&self) {
        let mut jobs = self.jobs.write().await;
        let count = jobs.len();
        for (_, tracked) in jobs.drain() {
            tracked.handle.abort();
        }
        if count > 0 {
            warn!(count, "Aborted in-flight jobs on shutdown");
        }
    }
}

/// Spawn a background task that periodically purges expired jobs.
pub fn spawn_retention_sweep(
    manager: Arc<LifecycleManager>,
    retention: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            manager.purge_expired(retention).await;
        }
    })
}

/// Run one job to a terminal state. Nothing raised in here escapes: errors
/// and panics become a `failed` transition.
async fn execute(
    store: Arc<dyn JobStore>,
    executor: Arc<dyn TaskExecutor>,
    ctx: ExecutionContext,
    job: Job,
) {
    let job_id = job.job_id;

    if let Err(e) = store
        .update(
            job_id,
            mutation(|job| {
                job.start()?;
                job.set_progress(0.1);
                Ok(())
            }),
        )
        .await
    {
        error!(job_id = %job_id, error = %e, "Could not start job");
        return;
    }
    info!(job_id = %job_id, executor = executor.name(), "Job running");

    let outcome = AssertUnwindSafe(async {
        let prompt = compose_prompt(&job.input_data);
        ctx.report_progress(0.3).await;
        executor.run(&prompt, &ctx).await
    })
    .catch_unwind()
    .await
    .unwrap_or_else(|panic| {
        Err(ExecutionError::Panicked {
            message: panic_message(panic.as_ref()),
        })
    });

    // The executor may have stopped waiting for input without an answer.
    ctx.waiters().cancel(job_id).await;
    drop(ctx);

    let committed = match outcome {
        Ok(result) => {
            store
                .update(
                    job_id,
                    mutation(move |job| {
                        job.end_wait()?;
                        job.complete(result)
                    }),
                )
                .await
        }
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Job failed");
            let message = e.to_string();
            store
                .update(
                    job_id,
                    mutation(move |job| {
                        job.end_wait()?;
                        job.fail(message)
                    }),
                )
                .await
        }
    };

    match committed {
        Ok(job) => info!(
            job_id = %job_id,
            status = %job.status,
            elapsed_ms = job.duration().map(|d| d.num_milliseconds()),
            "Job finished"
        ),
        Err(e) => error!(job_id = %job_id, error = %e, "Could not record job outcome"),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
