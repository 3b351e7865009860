//! Job system: lifecycle state, storage and background dispatch.
//!
//! Core components:
//! - `state`: Job state machine (Queued → Running → Completed/Failed)
//! - `model`: Job record with guarded transitions
//! - `store`: JobStore trait and the in-memory job table
//! - `prompt`: Prompt composition from submitted input
//! - `manager`: LifecycleManager: submit, dispatch, status, provide_input

pub mod manager;
pub mod model;
pub mod prompt;
pub mod state;
pub mod store;

pub use manager::{HealthSnapshot, LifecycleManager, spawn_retention_sweep};
pub use model::{InputData, Job};
pub use prompt::compose_prompt;
pub use state::JobStatus;
pub use store::{InMemoryJobStore, JobMutator, JobPage, JobStore, StatusCounts, mutation};
