//! Request and response bodies for the MIP-003 endpoints.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{JobError, ValidationError};
use crate::jobs::{InputData, Job, JobStatus};
use crate::schema::InputField;

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub status: &'static str,
    #[serde(rename = "type")]
    pub agent_type: &'static str,
    pub name: String,
    pub version: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InputSchemaResponse {
    pub input: Vec<InputField>,
}

#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    pub input_data: InputData,
    #[serde(default)]
    pub payment_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub job_id: String,
}

/// Job snapshot as reported by `/status`.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub progress: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status,
            result: job.result,
            error: job.error,
            progress: Some(job.progress),
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProvideInputRequest {
    pub job_id: String,
    pub input_data: InputData,
}

#[derive(Debug, Serialize)]
pub struct ProvideInputResponse {
    pub message: &'static str,
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub agent_name: String,
    pub version: String,
    pub model: String,
    pub executor: String,
    pub active_jobs: usize,
    pub total_jobs: usize,
    pub queued_jobs: usize,
    pub waiting_for_input: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<usize>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
    pub total: usize,
}

/// JSON body extractor whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor whose rejections render as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Error returned by a handler, rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// An id that is not a UUID can never match a stored job.
    pub fn job_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Job not found")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound { .. } => Self::job_not_found(),
            JobError::InvalidState { .. } | JobError::InvalidTransition { .. } => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_errors_map_to_status_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            ApiError::from(JobError::NotFound { id }).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(JobError::InvalidState {
                id,
                state: JobStatus::Running
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn validation_error_is_bad_request() {
        let err = ApiError::from(ValidationError::MissingRequiredField {
            name: "task".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, "Missing required field: task");
    }

    #[test]
    fn status_response_keeps_optional_fields() {
        let job = Job::new(InputData::new(), None);
        let body = serde_json::to_value(JobStatusResponse::from(job)).unwrap();
        assert_eq!(body["status"], "queued");
        assert_eq!(body["progress"], 0.0);
        assert!(body["result"].is_null());
        assert!(body["completed_at"].is_null());
    }

    #[test]
    fn start_job_request_payment_id_optional() {
        let req: StartJobRequest =
            serde_json::from_str(r#"{"input_data": {"task": "x"}}"#).unwrap();
        assert!(req.payment_id.is_none());
        assert_eq!(req.input_data["task"], "x");
    }
}
