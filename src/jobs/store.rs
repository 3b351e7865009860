//! Job store: the single source of truth for job lifecycle state.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::model::{InputData, Job};
use super::state::JobStatus;
use crate::error::JobError;

/// A field-group mutation applied atomically to one job. If it returns an
/// error the stored job is left exactly as it was.
pub type JobMutator = Box<dyn FnOnce(&mut Job) -> Result<(), JobError> + Send>;

/// Box a closure as a [`JobMutator`].
pub fn mutation<F>(f: F) -> JobMutator
where
    F: FnOnce(&mut Job) -> Result<(), JobError> + Send + 'static,
{
    Box::new(f)
}

/// Filtered, newest-first page of jobs.
#[derive(Debug, Clone)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    /// Number of jobs matching the filter before truncation.
    pub total: usize,
}

/// Number of jobs in each status, taken at a single instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: usize,
    pub running: usize,
    pub waiting_for_input: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn get(&self, status: JobStatus) -> usize {
        match status {
            JobStatus::Queued => self.queued,
            JobStatus::Running => self.running,
            JobStatus::WaitingForInput => self.waiting_for_input,
            JobStatus::Completed => self.completed,
            JobStatus::Failed => self.failed,
        }
    }

    pub fn total(&self) -> usize {
        self.queued + self.running + self.waiting_for_input + self.completed + self.failed
    }

    fn record(&mut self, status: JobStatus) {
        let slot = match status {
            JobStatus::Queued => &mut self.queued,
            JobStatus::Running => &mut self.running,
            JobStatus::WaitingForInput => &mut self.waiting_for_input,
            JobStatus::Completed => &mut self.completed,
            JobStatus::Failed => &mut self.failed,
        };
        *slot += 1;
    }
}

/// Storage for job records.
///
/// Callers only ever receive snapshots; all writes go through `update`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new queued job and return a snapshot of it.
    async fn create(&self, input_data: InputData, payment_id: Option<String>) -> Job;

    /// Snapshot of a job.
    async fn get(&self, job_id: Uuid) -> Result<Job, JobError>;

    /// Apply `mutator` to a job and return the committed snapshot.
    async fn update(&self, job_id: Uuid, mutator: JobMutator) -> Result<Job, JobError>;

    /// Jobs ordered by `created_at` descending, optionally filtered by status.
    async fn list(&self, status: Option<JobStatus>, limit: usize) -> JobPage;

    /// Per-status counts from one consistent pass over the table.
    async fn status_counts(&self) -> StatusCounts;

    /// Total number of stored jobs.
    async fn len(&self) -> usize;

    /// Drop terminal jobs that finished before `cutoff`. Returns how many
    /// were removed.
    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> usize;
}

/// Process-lifetime job table. Each record has its own lock, so writes to
/// different jobs never wait on each other; the map lock is only held to
/// look up or insert records.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Arc<Mutex<Job>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, job_id: Uuid) -> Result<Arc<Mutex<Job>>, JobError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(JobError::NotFound { id: job_id })
    }

    async fn snapshots(&self) -> Vec<Job> {
        let records: Vec<Arc<Mutex<Job>>> = self.jobs.read().await.values().cloned().collect();
        let mut jobs = Vec::with_capacity(records.len());
        for record in records {
            jobs.push(record.lock().await.clone());
        }
        jobs
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, input_data: InputData, payment_id: Option<String>) -> Job {
        let mut jobs = self.jobs.write().await;
        let mut job = Job::new(input_data, payment_id);
        loop {
            match jobs.entry(job.job_id) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Mutex::new(job.clone())));
                    return job;
                }
                Entry::Occupied(_) => job.job_id = Uuid::new_v4(),
            }
        }
    }

    async fn get(&self, job_id: Uuid) -> Result<Job, JobError> {
        let record = self.record(job_id).await?;
        let job = record.lock().await.clone();
        Ok(job)
    }

    async fn update(&self, job_id: Uuid, mutator: JobMutator) -> Result<Job, JobError> {
        let record = self.record(job_id).await?;
        let mut job = record.lock().await;

        let mut staged = job.clone();
        mutator(&mut staged)?;
        *job = staged;
        Ok(job.clone())
    }

    async fn list(&self, status: Option<JobStatus>, limit: usize) -> JobPage {
        let mut jobs: Vec<Job> = self
            .snapshots()
            .await
            .into_iter()
            .filter(|job| status.is_none_or(|s| job.status == s))
            .collect();

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = jobs.len();
        jobs.truncate(limit);

        JobPage { jobs, total }
    }

    async fn status_counts(&self) -> StatusCounts {
        let jobs = self.jobs.read().await;
        // Every record stays locked until counted, so no update lands
        // between two of them.
        let mut guards = Vec::with_capacity(jobs.len());
        for record in jobs.values() {
            guards.push(record.lock().await);
        }

        let mut counts = StatusCounts::default();
        for job in &guards {
            counts.record(job.status);
        }
        counts
    }

    async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        let mut expired = Vec::new();
        for (id, record) in jobs.iter() {
            let job = record.lock().await;
            if job.status.is_terminal() && job.completed_at.is_some_and(|done| done < cutoff) {
                expired.push(*id);
            }
        }
        for id in &expired {
            jobs.remove(id);
        }
        expired.len()
    }
}
