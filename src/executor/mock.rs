//! Mock executor used when no LLM credentials are configured.

use std::time::Duration;

use async_trait::async_trait;

use super::{ExecutionContext, TaskExecutor};
use crate::error::ExecutionError;

/// Echoes the submitted task back after a short simulated delay. Falls back
/// to the full prompt when the job has no `task` string.
pub struct MockExecutor {
    delay: Duration,
}

impl MockExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, prompt: &str, ctx: &ExecutionContext) -> Result<String, ExecutionError> {
        tokio::time::sleep(self.delay / 2).await;
        ctx.report_progress(0.6).await;
        tokio::time::sleep(self.delay / 2).await;

        let task = ctx
            .job()
            .await
            .ok()
            .and_then(|job| job.input_data.get("task")?.as_str().map(str::to_string))
            .unwrap_or_else(|| prompt.to_string());
        Ok(format!("[Mock Response] Processed task: {task}"))
    }
}
