//! MIP-003 handlers. Each one delegates to the lifecycle manager and maps
//! its typed errors onto HTTP status codes.

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use super::types::{
    ApiError, ApiJson, ApiQuery, AvailabilityResponse, HealthResponse, InputSchemaResponse,
    JobStatusResponse, ListJobsQuery, ListJobsResponse, ProvideInputRequest, ProvideInputResponse,
    StartJobRequest, StartJobResponse, StatusQuery,
};
use crate::config::AGENT_TYPE;
use crate::jobs::JobStatus;

/// Default page size for `/jobs`.
const DEFAULT_LIST_LIMIT: usize = 10;

fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::job_not_found())
}

/// GET /
pub(super) async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!("Welcome to {}", state.agent.name),
        "availability": "/availability",
    }))
}

/// GET /availability
pub(super) async fn availability(State(state): State<AppState>) -> Json<AvailabilityResponse> {
    Json(AvailabilityResponse {
        status: "available",
        agent_type: AGENT_TYPE,
        name: state.agent.name.clone(),
        version: state.agent.version.clone(),
        message: format!("{} is ready to accept jobs", state.agent.name),
    })
}

/// GET /input_schema
pub(super) async fn input_schema(State(state): State<AppState>) -> Json<InputSchemaResponse> {
    Json(InputSchemaResponse {
        input: state.manager.schema().to_vec(),
    })
}

/// POST /start_job
///
/// Validates the submission, queues the job and returns immediately.
pub(super) async fn start_job(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<StartJobRequest>,
) -> Result<Json<StartJobResponse>, ApiError> {
    let job_id = state.manager.submit(body.input_data, body.payment_id).await?;
    Ok(Json(StartJobResponse {
        job_id,
        status: JobStatus::Queued,
        message: "Job started successfully",
    }))
}

/// GET /status?job_id=
pub(super) async fn status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job_id = parse_job_id(&query.job_id)?;
    let job = state.manager.get_status(job_id).await?;
    Ok(Json(job.into()))
}

/// POST /provide_input
pub(super) async fn provide_input(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ProvideInputRequest>,
) -> Result<Json<ProvideInputResponse>, ApiError> {
    let job_id = parse_job_id(&body.job_id)?;
    state.manager.provide_input(job_id, body.input_data).await?;
    Ok(Json(ProvideInputResponse {
        message: "Input received",
        job_id,
    }))
}

/// GET /demo
pub(super) async fn demo(State(state): State<AppState>) -> impl IntoResponse {
    let name = &state.agent.name;
    Json(serde_json::json!({
        "demo": true,
        "agent_name": name,
        "example_output": format!(
            "This is a demo response from {name}. In production, this agent \
             processes submitted tasks with its configured model."
        ),
        "capabilities": [
            "Natural language processing",
            "Task execution",
            "Multi-step reasoning",
        ],
    }))
}

/// GET /health
pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.manager.health().await;
    Json(HealthResponse {
        status: "healthy",
        agent_name: state.agent.name.clone(),
        version: state.agent.version.clone(),
        model: state.agent.model.clone(),
        executor: state.manager.executor_name().to_string(),
        active_jobs: snapshot.active_jobs,
        total_jobs: snapshot.total_jobs,
        queued_jobs: snapshot.queued_jobs,
        waiting_for_input: snapshot.waiting_for_input,
    })
}

/// GET /jobs?limit=&status=
///
/// Newest first. `total` counts every match before truncation.
pub(super) async fn list_jobs(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListJobsQuery>,
) -> Json<ListJobsResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let page = state.manager.list_jobs(query.status, limit).await;
    info!(count = page.jobs.len(), total = page.total, "Listed jobs");
    Json(ListJobsResponse {
        jobs: page.jobs,
        total: page.total,
    })
}
