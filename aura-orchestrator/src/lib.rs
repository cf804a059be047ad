//! AURA Orchestrator - Intent Dispatch and Coordination
//!
//! Turns classified intents into registry operations or execution-backend
//! calls, and fans multi-agent goals out across the swarm.

pub mod backend;
pub mod coordinate;
pub mod decompose;
pub mod dispatcher;
pub mod status;

pub use backend::{reported_impact, reports_success, ExecutionBackend, HttpBackend};
pub use coordinate::{CoordinationResult, SubtaskReport, SUBTASK_ACTION};
pub use decompose::{Delimited, SingleTask, TaskDecomposer};
pub use dispatcher::{
    DispatchOutcome, Orchestrator, DEFAULT_BACKEND, DEFAULT_COMMIT_MESSAGE, DEFAULT_LANGUAGE,
    DEFAULT_MUTATION_FILENAME, DEFAULT_SHOTS, DEFAULT_TASK_TIMEOUT,
};
pub use status::{SwarmStatus, STATUS_PATH};
