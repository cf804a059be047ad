//! AURA Core - Swarm Data Model
//!
//! Agents, permission requests, activity entries, classified intents and
//! metric readings. Every other aura crate depends on this one.

pub mod activity;
pub mod agent;
pub mod error;
pub mod identity;
pub mod intent;
pub mod permission;
pub mod reading;

pub use activity::{ActivityLogEntry, ActivityResult, APPROVAL_IMPACT, DEFAULT_IMPACT, DENIAL_IMPACT};
pub use agent::{
    clamp_trust, Agent, AgentStatus, AgentStatusParseError, Outcome, Performance, DEFAULT_TRUST,
    GENERAL_SPECIALIZATION,
};
pub use error::{
    AgentError, AuraError, AuraResult, ClassifierError, ConfigError, DispatchError, FeedError,
    PermissionError, RecordKind, StorageError,
};
pub use identity::{ActivityId, AgentId, EntityIdType, PermissionRequestId, Timestamp};
pub use intent::{Action, CommandIntent, Entities};
pub use permission::{Decision, PermissionRequest, PermissionStatus, PermissionStatusParseError};
pub use reading::{
    health, Channel, ConsciousnessReading, HealthBand, PartialReading, Trend, PLACEHOLDER_GAMMA,
    PLACEHOLDER_LAMBDA, PLACEHOLDER_PHI, PLACEHOLDER_W2,
};
