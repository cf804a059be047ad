//! AURA Agents - Swarm Membership and Trust
//!
//! The agent registry with trust-weighted selection, the trust update rule,
//! the activity trail, and the permission workflow that is the only path by
//! which an agent gains new capabilities.

pub mod activity;
pub mod insights;
pub mod permission;
pub mod policy;
pub mod registry;
pub mod trust;

pub use activity::ActivityLog;
pub use insights::{analyze, ActivityInsights};
pub use permission::PermissionWorkflow;
pub use policy::{RepeatedActionPolicy, DEFAULT_REPEAT_THRESHOLD};
pub use registry::{AgentRegistry, TaskRecord};
pub use trust::{updated_trust, TrustChange, LEARNING_RATE};
