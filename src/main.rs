use std::sync::Arc;

use mip003_agent::api::{AgentInfo, AppState, app_routes};
use mip003_agent::config::AgentConfig;
use mip003_agent::executor::{MockExecutor, TaskExecutor, create_llm_executor};
use mip003_agent::jobs::{InMemoryJobStore, LifecycleManager, spawn_retention_sweep};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AgentConfig::from_env()?;
    let schema = config.input_schema()?;

    let executor: Arc<dyn TaskExecutor> = match &config.llm {
        Some(llm_config) => create_llm_executor(llm_config)?,
        None => {
            tracing::warn!("No LLM API key set, using mock executor");
            Arc::new(MockExecutor::new(config.mock_delay))
        }
    };

    let addr = config.bind_addr();
    eprintln!("🤖 {} v{}", config.name, config.version);
    eprintln!("   {}", config.description);
    eprintln!("   Model: {}", config.model);
    eprintln!("   Executor: {}", executor.name());
    eprintln!("   Input fields: {}", schema.len());
    eprintln!("   Max parallel jobs: {}", config.max_parallel_jobs);
    eprintln!("   API: http://{}/availability\n", addr);

    let manager = Arc::new(
        LifecycleManager::new(Arc::new(InMemoryJobStore::new()), executor, schema)
            .with_validation(config.validation)
            .with_max_parallel_jobs(config.max_parallel_jobs),
    );

    let sweep = config.job_retention.map(|retention| {
        tracing::info!(
            retention_secs = retention.as_secs(),
            "Job retention sweep enabled"
        );
        spawn_retention_sweep(
            Arc::clone(&manager),
            retention,
            config.retention_sweep_interval,
        )
    });

    let app = app_routes(AppState::new(
        Arc::clone(&manager),
        AgentInfo::from(&config),
    ));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "MIP-003 server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    if let Some(sweep) = sweep {
        sweep.abort();
    }
    manager.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}
