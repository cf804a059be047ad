//! Permission request workflow.
//!
//! `pending` moves exactly once, to `approved` or `denied`. Approval is the
//! only way an agent's permission set grows. Every decision appends one
//! activity entry.

use crate::registry::AgentRegistry;
use aura_core::{
    ActivityLogEntry, ActivityResult, AgentError, AgentId, AuraResult, Decision,
    PermissionError, PermissionRequest, PermissionRequestId, PermissionStatus, APPROVAL_IMPACT,
    DENIAL_IMPACT,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Requests {
    order: Vec<PermissionRequestId>,
    by_id: HashMap<PermissionRequestId, PermissionRequest>,
}

/// Tracks capability requests and operator decisions.
pub struct PermissionWorkflow {
    requests: RwLock<Requests>,
    registry: Arc<AgentRegistry>,
}

impl PermissionWorkflow {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            requests: RwLock::new(Requests::default()),
            registry,
        }
    }

    /// Load requests from the store. Returns the number added.
    pub async fn rehydrate(&self) -> AuraResult<usize> {
        let stored = self.registry.store().permission_list().await?;
        let mut requests = self.requests.write().await;
        let mut added = 0;
        for request in stored {
            if !requests.by_id.contains_key(&request.id) {
                requests.order.push(request.id);
                requests.by_id.insert(request.id, request);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Open a pending request on behalf of a registered agent.
    pub async fn request(
        &self,
        agent_id: AgentId,
        action: &str,
        resource: &str,
        reason: &str,
    ) -> AuraResult<PermissionRequest> {
        if !self.registry.contains(agent_id).await {
            return Err(AgentError::NotRegistered { agent_id }.into());
        }
        let request = PermissionRequest::new(agent_id, action, resource, reason);
        {
            let mut requests = self.requests.write().await;
            requests.order.push(request.id);
            requests.by_id.insert(request.id, request.clone());
        }
        if let Err(e) = self.registry.store().permission_insert(&request).await {
            tracing::warn!(request_id = %request.id, error = %e, "Failed to persist permission request");
        }
        tracing::info!(
            request_id = %request.id,
            agent_id = %agent_id,
            action,
            resource,
            "Permission requested"
        );
        Ok(request)
    }

    /// Decide a pending request.
    ///
    /// Deciding a request that is no longer pending is rejected with
    /// [`PermissionError::AlreadyDecided`].
    pub async fn decide(
        &self,
        request_id: PermissionRequestId,
        decision: Decision,
    ) -> AuraResult<PermissionRequest> {
        let decided = {
            let mut requests = self.requests.write().await;
            let request = requests
                .by_id
                .get_mut(&request_id)
                .ok_or(PermissionError::NotFound { request_id })?;
            if request.status.is_terminal() {
                return Err(PermissionError::AlreadyDecided {
                    request_id,
                    status: request.status,
                }
                .into());
            }
            // Grant before flipping the status; a failed grant leaves the request pending.
            if decision == Decision::Approve {
                self.registry
                    .grant_permission(request.agent_id, &request.action)
                    .await?;
            }
            request.status = decision.resulting_status();
            request.clone()
        };

        if let Err(e) = self.registry.store().permission_update(&decided).await {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to persist permission decision");
        }

        let (result, impact) = match decision {
            Decision::Approve => (ActivityResult::Success, APPROVAL_IMPACT),
            Decision::Deny => (ActivityResult::Failure, DENIAL_IMPACT),
        };
        self.registry
            .activity()
            .append(ActivityLogEntry::new(
                decided.agent_id,
                format!("Permission {}: {}", decided.status, decided.action),
                result,
                decided.reason.as_str(),
                impact,
            ))
            .await;

        tracing::info!(
            request_id = %request_id,
            agent_id = %decided.agent_id,
            status = %decided.status,
            "Permission decided"
        );
        Ok(decided)
    }

    pub async fn get(&self, request_id: PermissionRequestId) -> Option<PermissionRequest> {
        self.requests.read().await.by_id.get(&request_id).cloned()
    }

    /// Requests in creation order.
    pub async fn list(&self) -> Vec<PermissionRequest> {
        let requests = self.requests.read().await;
        requests
            .order
            .iter()
            .filter_map(|id| requests.by_id.get(id).cloned())
            .collect()
    }

    pub async fn pending(&self) -> Vec<PermissionRequest> {
        self.list()
            .await
            .into_iter()
            .filter(PermissionRequest::is_pending)
            .collect()
    }

    /// True if `agent_id` already has a pending request for `action`.
    pub async fn has_pending(&self, agent_id: AgentId, action: &str) -> bool {
        self.requests
            .read()
            .await
            .by_id
            .values()
            .any(|r| r.agent_id == agent_id && r.action == action && r.status == PermissionStatus::Pending)
    }
}
