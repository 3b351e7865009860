//! Error types for the agent server.

use uuid::Uuid;

use crate::jobs::JobStatus;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load input schema from {path}: {source}")]
    Schema { path: String, source: SchemaError },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems in a declared input schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Field names must not be empty")]
    EmptyFieldName,

    #[error("Duplicate field name: {name}")]
    DuplicateField { name: String },

    #[error("Field {field}: data.{key} must be a number")]
    BoundNotNumber { field: String, key: String },

    #[error("Field {field}: data.options must be an array")]
    OptionsNotArray { field: String },

    #[error("Field {field}: unsupported option entry {entry}")]
    BadOption { field: String, entry: String },
}

/// Rejections from the input-schema gate. A rejected submission never
/// creates a job.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {name}")]
    MissingRequiredField { name: String },

    #[error("Field {name} must be of type {expected}")]
    WrongType { name: String, expected: String },

    #[error("Field {name} must be one of [{allowed}], got {value}")]
    NotAnOption {
        name: String,
        value: String,
        allowed: String,
    },

    #[error("Field {name} is out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: String,
        max: String,
    },
}

/// Job lookup and lifecycle errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobError {
    #[error("Job {id} not found")]
    NotFound { id: Uuid },

    #[error("Job {id} is not waiting for input (status: {state})")]
    InvalidState { id: Uuid, state: JobStatus },

    #[error("Job {id} cannot transition from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Failures raised by a task executor. Recorded on the job, never returned
/// through the request that submitted it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("{message}")]
    Failed { message: String },

    #[error("Executor panicked: {message}")]
    Panicked { message: String },

    #[error("Job {id} could not wait for input: {reason}")]
    InputUnavailable { id: Uuid, reason: String },
}

impl ExecutionError {
    /// Shorthand for the common opaque failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
