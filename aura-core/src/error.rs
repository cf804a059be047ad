//! Error types for swarm operations

use crate::{AgentId, PermissionRequestId, PermissionStatus};
use thiserror::Error;

/// Kind of record held by the persistent store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Agent,
    PermissionRequest,
    ActivityLog,
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found: {kind:?} with id {id}")]
    NotFound { kind: RecordKind, id: String },

    #[error("Insert failed for {kind:?}: {reason}")]
    InsertFailed { kind: RecordKind, reason: String },

    #[error("Update failed for {kind:?} with id {id}: {reason}")]
    UpdateFailed {
        kind: RecordKind,
        id: String,
        reason: String,
    },

    #[error("Remote store request to {endpoint} failed: {reason}")]
    Remote { endpoint: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Intent classification errors.
///
/// Only the remote fallback can fail; local classification is total for
/// non-empty input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("Command text is empty")]
    EmptyCommand,

    #[error("Remote classifier timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Remote classifier request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Malformed remote classifier response: {reason}")]
    MalformedResponse { reason: String },
}

/// Agent registry errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AgentError {
    #[error("Agent not registered: {agent_id}")]
    NotRegistered { agent_id: AgentId },

    #[error("Invalid trust score {trust}: must be within [0, 1]")]
    InvalidTrust { trust: f64 },
}

/// Permission workflow errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("Permission request not found: {request_id}")]
    NotFound { request_id: PermissionRequestId },

    #[error("Permission request {request_id} was already {status}")]
    AlreadyDecided {
        request_id: PermissionRequestId,
        status: PermissionStatus,
    },
}

/// Task dispatch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Execution backend request to {endpoint} failed: {reason}")]
    Backend { endpoint: String, reason: String },

    #[error("Execution backend timed out after {timeout_ms}ms on {endpoint}")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("Missing required entity '{entity}' for action {action}")]
    MissingEntity { action: String, entity: String },

    #[error("Failed to read artifact {path}: {reason}")]
    ArtifactUnreadable { path: String, reason: String },

    #[error("Subtask {index} on agent {agent_id} failed: {reason}")]
    SubtaskFailed {
        index: usize,
        agent_id: AgentId,
        reason: String,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Metrics feed errors. The feed itself never surfaces these; they are
/// logged and the feed falls back to polling.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("Failed to connect push channel {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("Push channel closed")]
    Closed,

    #[error("Status poll of {endpoint} failed: {reason}")]
    Poll { endpoint: String, reason: String },

    #[error("Malformed metrics payload: {reason}")]
    Malformed { reason: String },
}

/// Master error type for all swarm errors.
#[derive(Debug, Clone, Error)]
pub enum AuraError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Permission error: {0}")]
    Permission(#[from] PermissionError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

impl AuraError {
    /// True for errors the caller caused and should not retry as-is.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AuraError::Permission(_)
                | AuraError::Config(_)
                | AuraError::Classifier(ClassifierError::EmptyCommand)
                | AuraError::Agent(AgentError::InvalidTrust { .. })
                | AuraError::Dispatch(DispatchError::MissingEntity { .. })
        )
    }
}

/// Result type alias for swarm operations.
pub type AuraResult<T> = Result<T, AuraError>;
