//! HTTP gateway for the MIP-003 job protocol.

pub mod routes;
pub mod types;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AgentConfig;
use crate::jobs::LifecycleManager;

/// Identity reported by the informational endpoints.
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub name: String,
    pub version: String,
    pub model: String,
}

impl From<&AgentConfig> for AgentInfo {
    fn from(config: &AgentConfig) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            model: config.model.clone(),
        }
    }
}

/// Shared state for the gateway.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LifecycleManager>,
    pub agent: Arc<AgentInfo>,
}

impl AppState {
    pub fn new(manager: Arc<LifecycleManager>, agent: AgentInfo) -> Self {
        Self {
            manager,
            agent: Arc::new(agent),
        }
    }
}

/// Build the gateway router.
pub fn app_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/availability", get(routes::availability))
        .route("/input_schema", get(routes::input_schema))
        .route("/start_job", post(routes::start_job))
        .route("/status", get(routes::status))
        .route("/provide_input", post(routes::provide_input))
        .route("/demo", get(routes::demo))
        .route("/health", get(routes::health))
        .route("/jobs", get(routes::list_jobs))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
