//! In-memory activity trail mirrored to the store.

use aura_core::{ActivityLogEntry, AgentId, AuraResult};
use aura_storage::SwarmStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Append-only activity log. Entries are never mutated once appended.
#[derive(Clone)]
pub struct ActivityLog {
    entries: Arc<RwLock<Vec<ActivityLogEntry>>>,
    store: Arc<dyn SwarmStore>,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn SwarmStore>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            store,
        }
    }

    /// Append `entry` locally and mirror it to the store.
    ///
    /// A failed store write is logged and does not undo the local append.
    pub async fn append(&self, entry: ActivityLogEntry) {
        if let Err(e) = self.store.activity_insert(&entry).await {
            tracing::warn!(
                entry_id = %entry.id,
                agent_id = %entry.agent_id,
                error = %e,
                "Failed to persist activity entry"
            );
        }
        self.entries.write().await.push(entry);
    }

    /// Replace the local trail with what the store holds.
    pub async fn rehydrate(&self) -> AuraResult<usize> {
        let stored = self.store.activity_list(None, None).await?;
        let count = stored.len();
        *self.entries.write().await = stored;
        Ok(count)
    }

    /// All entries, oldest first.
    pub async fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn for_agent(&self, agent_id: AgentId) -> Vec<ActivityLogEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .cloned()
            .collect()
    }

    /// The newest `limit` entries, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<ActivityLogEntry> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// How many times `agent_id` has logged `action`.
    pub async fn count_action(&self, agent_id: AgentId, action: &str) -> usize {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.agent_id == agent_id && e.action == action)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::{ActivityResult, EntityIdType};
    use aura_storage::MemoryStore;

    fn entry(agent_id: AgentId, action: &str) -> ActivityLogEntry {
        ActivityLogEntry::new(agent_id, action, ActivityResult::Success, "", 5.0)
    }

    #[tokio::test]
    async fn test_append_mirrors_to_store() {
        let store = Arc::new(MemoryStore::new());
        let log = ActivityLog::new(store.clone());
        log.append(entry(AgentId::now_v7(), "optimize_circuit")).await;
        assert_eq!(log.len().await, 1);
        assert_eq!(store.activity_count(), 1);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let log = ActivityLog::new(Arc::new(MemoryStore::new()));
        let id = AgentId::now_v7();
        for action in ["a", "b", "c"] {
            log.append(entry(id, action)).await;
        }
        let recent: Vec<String> = log.recent(2).await.into_iter().map(|e| e.action).collect();
        assert_eq!(recent, ["c", "b"]);
    }

    #[tokio::test]
    async fn test_count_action_is_per_agent() {
        let log = ActivityLog::new(Arc::new(MemoryStore::new()));
        let a = AgentId::now_v7();
        let b = AgentId::now_v7();
        log.append(entry(a, "deploy")).await;
        log.append(entry(a, "deploy")).await;
        log.append(entry(b, "deploy")).await;
        assert_eq!(log.count_action(a, "deploy").await, 2);
        assert_eq!(log.for_agent(b).await.len(), 1);
    }

    #[tokio::test]
    async fn test_rehydrate_loads_store() {
        let store = Arc::new(MemoryStore::new());
        let first = ActivityLog::new(store.clone());
        first.append(entry(AgentId::now_v7(), "x")).await;

        let second = ActivityLog::new(store);
        assert!(second.is_empty().await);
        assert_eq!(second.rehydrate().await.unwrap(), 1);
        assert_eq!(second.len().await, 1);
    }
}
