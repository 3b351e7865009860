//! Task execution backends.
//!
//! The lifecycle manager treats an executor as an opaque capability: given a
//! prompt, eventually produce text or fail. Executors never touch the job
//! table directly; the [`ExecutionContext`] they receive routes progress
//! reports and input requests through the store's update contract.

pub mod llm;
pub mod mock;

pub use llm::{LlmBackend, LlmConfig, create_llm_executor};
pub use mock::MockExecutor;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ExecutionError, JobError};
use crate::jobs::{InputData, Job, JobStore, mutation};

/// Performs the actual work of a job.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Backend name, for logs and the health endpoint.
    fn name(&self) -> &str;

    /// Run the prompt to completion.
    async fn run(&self, prompt: &str, ctx: &ExecutionContext) -> Result<String, ExecutionError>;
}

/// Paused executions waiting on `provide_input`, keyed by job id.
#[derive(Default)]
pub struct InputWaiters {
    pending: Mutex<HashMap<Uuid, oneshot::Sender<InputData>>>,
}

impl InputWaiters {
    pub fn new() -> Self {
        Self::default()
    }

    async fn register(&self, job_id: Uuid) -> oneshot::Receiver<InputData> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(job_id, tx);
        rx
    }

    /// Hand `input` to the execution paused on `job_id`. Returns false if
    /// nothing was waiting.
    pub async fn deliver(&self, job_id: Uuid, input: InputData) -> bool {
        match self.pending.lock().await.remove(&job_id) {
            Some(tx) => tx.send(input).is_ok(),
            None => false,
        }
    }

    /// Drop the waiter for `job_id`, if any.
    pub async fn cancel(&self, job_id: Uuid) {
        self.pending.lock().await.remove(&job_id);
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// Worker-pool permit held by a running execution.
struct WorkerSlot {
    pool: Arc<Semaphore>,
    permit: Mutex<Option<OwnedSemaphorePermit>>,
}

/// Handle given to an executor for one job.
pub struct ExecutionContext {
    job_id: Uuid,
    store: Arc<dyn JobStore>,
    waiters: Arc<InputWaiters>,
    slot: Option<WorkerSlot>,
}

impl ExecutionContext {
    pub fn new(job_id: Uuid, store: Arc<dyn JobStore>, waiters: Arc<InputWaiters>) -> Self {
        Self {
            job_id,
            store,
            waiters,
            slot: None,
        }
    }

    /// Attach the worker-pool permit this execution runs under. It is given
    /// back to `pool` while the job waits for input.
    pub fn with_worker_slot(mut self, pool: Arc<Semaphore>, permit: OwnedSemaphorePermit) -> Self {
        self.slot = Some(WorkerSlot {
            pool,
            permit: Mutex::new(Some(permit)),
        });
        self
    }

    async fn release_slot(&self) {
        if let Some(slot) = &self.slot {
            slot.permit.lock().await.take();
        }
    }

    async fn reclaim_slot(&self) -> Result<(), ExecutionError> {
        let Some(slot) = &self.slot else {
            return Ok(());
        };
        let mut held = slot.permit.lock().await;
        if held.is_none() {
            let permit = Arc::clone(&slot.pool)
                .acquire_owned()
                .await
                .map_err(|e| ExecutionError::failed(format!("Worker pool closed: {e}")))?;
            *held = Some(permit);
        }
        Ok(())
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub(crate) fn waiters(&self) -> &InputWaiters {
        &self.waiters
    }

    /// Current snapshot of the job being executed.
    pub async fn job(&self) -> Result<Job, JobError> {
        self.store.get(self.job_id).await
    }

    /// Raise the job's progress. Values below the current progress are
    /// ignored.
    pub async fn report_progress(&self, progress: f64) {
        match self
            .store
            .update(
                self.job_id,
                mutation(move |job| {
                    job.set_progress(progress);
                    Ok(())
                }),
            )
            .await
        {
            Ok(job) => debug!(job_id = %self.job_id, progress = job.progress, "Progress reported"),
            Err(e) => warn!(job_id = %self.job_id, error = %e, "Failed to report progress"),
        }
    }

    /// Pause the job in `waiting_for_input` until the caller supplies more
    /// input, then resume with it.
    ///
    /// The worker slot is released for the duration of the wait and taken
    /// back before returning. An executor that abandons the wait early runs
    /// without a slot until it asks for input again or finishes.
    pub async fn request_input(&self) -> Result<InputData, ExecutionError> {
        self.reclaim_slot().await?;

        // Register before the status flips so a fast provide_input always
        // finds the waiter.
        let rx = self.waiters.register(self.job_id).await;

        if let Err(e) = self
            .store
            .update(self.job_id, mutation(|job| job.wait_for_input()))
            .await
        {
            self.waiters.cancel(self.job_id).await;
            return Err(ExecutionError::InputUnavailable {
                id: self.job_id,
                reason: e.to_string(),
            });
        }
        info!(job_id = %self.job_id, "Job waiting for input");

        self.release_slot().await;
        let input = rx.await.map_err(|_| ExecutionError::InputUnavailable {
            id: self.job_id,
            reason: "input channel closed".to_string(),
        })?;
        self.reclaim_slot().await?;
        Ok(input)
    }
}
