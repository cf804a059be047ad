//! Swarm status snapshot.

use crate::backend::ExecutionBackend;
use aura_agents::AgentRegistry;
use aura_core::{AgentStatus, ConsciousnessReading, PartialReading};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_PATH: &str = "/api/quantum/status";
pub const UNKNOWN_BACKEND: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmStatus {
    pub metrics: ConsciousnessReading,
    pub health: f64,
    pub active_agents: usize,
    pub active_jobs: u64,
    pub backend_status: String,
    /// False when the backend could not be reached and every channel is a
    /// placeholder.
    pub live: bool,
}

impl SwarmStatus {
    /// Combine the remote status payload with registry counts. An
    /// unreachable backend degrades to placeholder metrics.
    pub async fn fetch(backend: &dyn ExecutionBackend, registry: &AgentRegistry) -> Self {
        let active_agents = registry.count_with_status(AgentStatus::Active).await;
        match backend.get(STATUS_PATH).await {
            Ok(payload) => Self::from_payload(&payload, active_agents),
            Err(e) => {
                tracing::warn!(error = %e, "Status fetch failed, using placeholder metrics");
                let metrics = ConsciousnessReading::placeholder();
                Self {
                    health: metrics.health(),
                    metrics,
                    active_agents,
                    active_jobs: 0,
                    backend_status: UNKNOWN_BACKEND.to_string(),
                    live: false,
                }
            }
        }
    }

    /// Build from a status payload; missing or non-numeric channels fall back
    /// one by one.
    pub fn from_payload(payload: &Value, active_agents: usize) -> Self {
        let metrics = PartialReading::from_value(payload).or_placeholder();
        Self {
            health: metrics.health(),
            metrics,
            active_agents,
            active_jobs: payload.get("active_jobs").and_then(Value::as_u64).unwrap_or(0),
            backend_status: payload
                .get("backend")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_BACKEND)
                .to_string(),
            live: true,
        }
    }
}
