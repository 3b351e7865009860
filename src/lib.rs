//! MIP-003 agent: job lifecycle server.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod schema;

pub use config::AgentConfig;
pub use error::{Error, Result};
