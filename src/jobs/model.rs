//! Job record and its guarded field-group transitions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::state::JobStatus;
use crate::error::JobError;

/// Submitted input: field name to JSON value.
pub type InputData = serde_json::Map<String, serde_json::Value>;

/// One unit of submitted work.
///
/// Mutators keep the record consistent with its status: `result` only when
/// completed, `error` only when failed, `completed_at` only when terminal.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub input_data: InputData,
    pub payment_id: Option<String>,
    /// Supplementary input merged in by `provide_input`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_input: Option<InputData>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a queued job with a fresh id.
    pub fn new(input_data: InputData, payment_id: Option<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            status: JobStatus::Queued,
            input_data,
            payment_id,
            additional_input: None,
            result: None,
            error: None,
            progress: 0.0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn transition_to(&mut self, target: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(target) {
            return Err(JobError::InvalidTransition {
                id: self.job_id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    /// Queued -> Running.
    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition_to(JobStatus::Running)
    }

    /// Raise progress to `value`, clamped to [0, 1]. Lower values and
    /// updates on terminal jobs are ignored. Returns the stored progress.
    pub fn set_progress(&mut self, value: f64) -> f64 {
        if self.status.is_terminal() || value.is_nan() {
            return self.progress;
        }
        let value = value.clamp(0.0, 1.0);
        if value > self.progress {
            self.progress = value;
        }
        self.progress
    }

    /// Running -> Completed.
    pub fn complete(&mut self, result: impl Into<String>) -> Result<(), JobError> {
        self.transition_to(JobStatus::Completed)?;
        self.result = Some(result.into());
        self.progress = 1.0;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Running -> Failed.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), JobError> {
        self.transition_to(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Running -> WaitingForInput.
    pub fn wait_for_input(&mut self) -> Result<(), JobError> {
        self.transition_to(JobStatus::WaitingForInput)
    }

    /// WaitingForInput -> Running, merging `extra` into the supplementary
    /// input. Later keys overwrite earlier ones.
    pub fn resume(&mut self, extra: InputData) -> Result<(), JobError> {
        if self.status != JobStatus::WaitingForInput {
            return Err(JobError::InvalidState {
                id: self.job_id,
                state: self.status,
            });
        }
        self.transition_to(JobStatus::Running)?;
        self.additional_input
            .get_or_insert_with(InputData::new)
            .extend(extra);
        Ok(())
    }

    /// WaitingForInput -> Running without new input, for an execution that
    /// stopped waiting on its own. No-op in any other status.
    pub fn end_wait(&mut self) -> Result<(), JobError> {
        if self.status == JobStatus::WaitingForInput {
            self.transition_to(JobStatus::Running)?;
        }
        Ok(())
    }

    /// Time spent between creation and completion, if finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(task: &str) -> InputData {
        let mut data = InputData::new();
        data.insert("task".into(), json!(task));
        data
    }

    #[test]
    fn new_job_is_queued() {
        let job = Job::new(input("x"), Some("pay_1".into()));
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0.0);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert!(job.completed_at.is_none());
        assert_eq!(job.payment_id.as_deref(), Some("pay_1"));
    }

    #[test]
    fn complete_sets_result_and_timestamp() {
        let mut job = Job::new(input("x"), None);
        job.start().unwrap();
        job.set_progress(0.3);
        job.complete("done").unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.as_deref(), Some("done"));
        assert!(job.error.is_none());
        assert_eq!(job.progress, 1.0);
        assert!(job.completed_at.is_some());
        assert!(job.duration().is_some());
    }

    #[test]
    fn fail_sets_error_only() {
        let mut job = Job::new(input("x"), None);
        job.start().unwrap();
        job.fail("boom").unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.result.is_none());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn cannot_complete_from_queued() {
        let mut job = Job::new(input("x"), None);
        let err = job.complete("early").unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
        assert!(job.result.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn terminal_job_is_frozen() {
        let mut job = Job::new(input("x"), None);
        job.start().unwrap();
        job.complete("first").unwrap();
        let completed_at = job.completed_at;

        assert!(job.fail("second").is_err());
        assert!(job.complete("again").is_err());
        assert_eq!(job.result.as_deref(), Some("first"));
        assert!(job.error.is_none());
        assert_eq!(job.completed_at, completed_at);
    }

    #[test]
    fn progress_never_decreases() {
        let mut job = Job::new(input("x"), None);
        job.start().unwrap();
        assert_eq!(job.set_progress(0.3), 0.3);
        assert_eq!(job.set_progress(0.1), 0.3);
        assert_eq!(job.set_progress(7.0), 1.0);
        assert_eq!(job.set_progress(f64::NAN), 1.0);
    }

    #[test]
    fn resume_merges_additional_input() {
        let mut job = Job::new(input("x"), None);
        job.start().unwrap();
        job.wait_for_input().unwrap();

        let mut extra = InputData::new();
        extra.insert("answer".into(), json!("yes"));
        job.resume(extra).unwrap();

        assert_eq!(job.status, JobStatus::Running);
        let additional = job.additional_input.as_ref().unwrap();
        assert_eq!(additional["answer"], json!("yes"));
        // Original input is untouched.
        assert_eq!(job.input_data["task"], json!("x"));
    }

    #[test]
    fn resume_outside_waiting_is_invalid_state() {
        let mut job = Job::new(input("x"), None);
        job.start().unwrap();
        let err = job.resume(InputData::new()).unwrap_err();
        assert!(matches!(
            err,
            JobError::InvalidState {
                state: JobStatus::Running,
                ..
            }
        ));
        assert!(job.additional_input.is_none());
    }

    #[test]
    fn abandoned_wait_can_still_finish() {
        let mut job = Job::new(input("x"), None);
        job.start().unwrap();
        job.wait_for_input().unwrap();

        job.end_wait().unwrap();
        job.fail("no answer in time").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.completed_at.is_some());
        assert!(job.additional_input.is_none());
    }

    #[test]
    fn end_wait_outside_waiting_is_noop() {
        let mut job = Job::new(input("x"), None);
        job.end_wait().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let job = Job::new(input("x"), None);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "queued");
        assert_eq!(value["job_id"], job.job_id.to_string());
        assert!(value["result"].is_null());
        assert!(value.get("additional_input").is_none());
    }
}
