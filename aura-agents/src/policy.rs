//! Repeated-action permission policy.

use crate::permission::PermissionWorkflow;
use crate::registry::AgentRegistry;
use aura_core::{AgentId, AuraResult, PermissionRequest};
use std::sync::Arc;

/// Default number of repetitions that triggers a request.
pub const DEFAULT_REPEAT_THRESHOLD: usize = 3;

/// Opens a permission request once an agent keeps performing an action it
/// holds no permission for.
pub struct RepeatedActionPolicy {
    registry: Arc<AgentRegistry>,
    workflow: Arc<PermissionWorkflow>,
    threshold: usize,
}

impl RepeatedActionPolicy {
    pub fn new(registry: Arc<AgentRegistry>, workflow: Arc<PermissionWorkflow>) -> Self {
        Self {
            registry,
            workflow,
            threshold: DEFAULT_REPEAT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    /// Check `action` for `agent_id` and open a request if warranted.
    ///
    /// Returns `None` when the agent already holds the permission, has a
    /// pending request for it, or has not yet reached the threshold.
    pub async fn evaluate(
        &self,
        agent_id: AgentId,
        action: &str,
        resource: &str,
    ) -> AuraResult<Option<PermissionRequest>> {
        let Some(agent) = self.registry.get(agent_id).await else {
            return Ok(None);
        };
        if agent.has_permission(action) || self.workflow.has_pending(agent_id, action).await {
            return Ok(None);
        }
        let count = self.registry.activity().count_action(agent_id, action).await;
        if count < self.threshold {
            return Ok(None);
        }

        let reason = format!(
            "Detected pattern: agent {} performed '{}' {} times",
            agent.name, action, count
        );
        tracing::debug!(agent_id = %agent_id, action, count, "Repeated action detected");
        self.workflow
            .request(agent_id, action, resource, &reason)
            .await
            .map(Some)
    }
}
