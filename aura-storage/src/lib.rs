//! AURA Storage - Durable Swarm Records
//!
//! The orchestrator keeps agents in memory and mirrors every write to a
//! [`SwarmStore`]. Only insert, update and select-by-key are required of a
//! store; nothing spans more than one table.

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::{RestStore, RestStoreConfig};

use async_trait::async_trait;
use aura_core::{
    ActivityLogEntry, Agent, AgentId, AuraResult, PermissionRequest, PermissionRequestId,
};

/// Durable storage for agents, permission requests and activity entries.
#[async_trait]
pub trait SwarmStore: Send + Sync {
    // ========================================================================
    // AGENT OPERATIONS
    // ========================================================================

    /// Insert a new agent.
    async fn agent_insert(&self, agent: &Agent) -> AuraResult<()>;

    /// Replace a stored agent.
    async fn agent_update(&self, agent: &Agent) -> AuraResult<()>;

    async fn agent_get(&self, id: AgentId) -> AuraResult<Option<Agent>>;

    /// All agents, oldest first.
    async fn agent_list(&self) -> AuraResult<Vec<Agent>>;

    // ========================================================================
    // PERMISSION OPERATIONS
    // ========================================================================

    async fn permission_insert(&self, request: &PermissionRequest) -> AuraResult<()>;

    async fn permission_update(&self, request: &PermissionRequest) -> AuraResult<()>;

    async fn permission_get(&self, id: PermissionRequestId) -> AuraResult<Option<PermissionRequest>>;

    /// All permission requests, oldest first.
    async fn permission_list(&self) -> AuraResult<Vec<PermissionRequest>>;

    // ========================================================================
    // ACTIVITY OPERATIONS
    // ========================================================================

    /// Append an entry. Entries are never updated.
    async fn activity_insert(&self, entry: &ActivityLogEntry) -> AuraResult<()>;

    /// Entries oldest first, optionally for a single agent, keeping the most
    /// recent `limit`.
    async fn activity_list(
        &self,
        agent_id: Option<AgentId>,
        limit: Option<usize>,
    ) -> AuraResult<Vec<ActivityLogEntry>>;
}
