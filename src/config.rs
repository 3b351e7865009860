//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::executor::llm::DEFAULT_SYSTEM_PROMPT;
use crate::executor::{LlmBackend, LlmConfig};
use crate::schema::{InputField, ValidationMode, default_schema, load_schema};

/// MIP-003 agent type reported by `/availability`.
pub const AGENT_TYPE: &str = "masumi-agent";

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent name for identification.
    pub name: String,
    pub version: String,
    pub description: String,
    /// Model name reported to clients and used by the LLM executor.
    pub model: String,
    pub host: String,
    pub port: u16,
    /// LLM settings. `None` runs the mock executor.
    pub llm: Option<LlmConfig>,
    /// Delay of the mock executor.
    pub mock_delay: Duration,
    /// Maximum number of jobs executing at once.
    pub max_parallel_jobs: usize,
    /// Finished jobs older than this are purged. `None` keeps them for the
    /// life of the process.
    pub job_retention: Option<Duration>,
    pub retention_sweep_interval: Duration,
    pub validation: ValidationMode,
    /// JSON file overriding the built-in input schema.
    pub schema_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "My Agent".to_string(),
            version: "1.0.0".to_string(),
            description: "A professional AI agent".to_string(),
            model: "gpt-4o-mini".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            llm: None,
            mock_delay: Duration::from_secs(2),
            max_parallel_jobs: crate::jobs::manager::DEFAULT_MAX_PARALLEL_JOBS,
            job_retention: None,
            retention_sweep_interval: Duration::from_secs(60), // 1 minute
            validation: ValidationMode::Presence,
            schema_path: None,
        }
    }
}

impl AgentConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Unset or empty keys fall
    /// back to defaults; set but malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let model = get("MODEL_NAME").unwrap_or(defaults.model);
        let system_prompt =
            get("AGENT_SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let max_tokens: u64 = parse_or(get("AGENT_MAX_TOKENS"), "AGENT_MAX_TOKENS", 1000)?;
        let llm = select_llm(
            get("OPENAI_API_KEY"),
            get("ANTHROPIC_API_KEY"),
            &model,
            system_prompt,
            max_tokens,
        );

        let job_retention = match get("AGENT_JOB_RETENTION_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_value(
                &raw,
                "AGENT_JOB_RETENTION_SECS",
            )?)),
            None => None,
        };

        let validation = if parse_or(get("AGENT_STRICT_INPUT"), "AGENT_STRICT_INPUT", false)? {
            ValidationMode::Strict
        } else {
            ValidationMode::Presence
        };

        let max_parallel_jobs: usize = parse_or(
            get("AGENT_MAX_PARALLEL_JOBS"),
            "AGENT_MAX_PARALLEL_JOBS",
            defaults.max_parallel_jobs,
        )?;
        if max_parallel_jobs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AGENT_MAX_PARALLEL_JOBS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            name: get("AGENT_NAME").unwrap_or(defaults.name),
            version: get("AGENT_VERSION").unwrap_or(defaults.version),
            description: get("AGENT_DESCRIPTION").unwrap_or(defaults.description),
            model,
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(get("PORT"), "PORT", defaults.port)?,
            llm,
            mock_delay: Duration::from_millis(parse_or(
                get("AGENT_MOCK_DELAY_MS"),
                "AGENT_MOCK_DELAY_MS",
                2000,
            )?),
            max_parallel_jobs,
            job_retention,
            retention_sweep_interval: defaults.retention_sweep_interval,
            validation,
            schema_path: get("AGENT_INPUT_SCHEMA").map(PathBuf::from),
        })
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured input schema, or the built-in one.
    pub fn input_schema(&self) -> Result<Vec<InputField>, ConfigError> {
        match &self.schema_path {
            Some(path) => load_schema(path),
            None => Ok(default_schema()),
        }
    }
}

/// Pick an LLM backend from the available keys. Claude models prefer the
/// Anthropic key; otherwise OpenAI wins when both are set.
fn select_llm(
    openai_key: Option<String>,
    anthropic_key: Option<String>,
    model: &str,
    system_prompt: String,
    max_tokens: u64,
) -> Option<LlmConfig> {
    let (backend, key) = match (openai_key, anthropic_key) {
        (_, Some(key)) if model.starts_with("claude") => (LlmBackend::Anthropic, key),
        (Some(key), _) => (LlmBackend::OpenAi, key),
        (None, Some(key)) => (LlmBackend::Anthropic, key),
        (None, None) => return None,
    };

    Some(LlmConfig {
        backend,
        api_key: secrecy::SecretString::from(key),
        model: model.to_string(),
        system_prompt,
        max_tokens,
    })
}

fn parse_value<T: FromStr>(raw: &str, key: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("cannot parse {raw:?}"),
    })
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => parse_value(&raw, key),
        None => Ok(default),
    }
}
