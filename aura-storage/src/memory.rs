use crate::SwarmStore;
use async_trait::async_trait;
use aura_core::{
    ActivityLogEntry, Agent, AgentId, AuraError, AuraResult, PermissionRequest,
    PermissionRequestId, RecordKind, StorageError,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-process store. Used by tests and when no remote store is configured.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    agents: Arc<RwLock<Table<AgentId, Agent>>>,
    permissions: Arc<RwLock<Table<PermissionRequestId, PermissionRequest>>>,
    activity: Arc<RwLock<Vec<ActivityLogEntry>>>,
}

/// Keyed rows that remember insertion order.
#[derive(Debug)]
struct Table<K, V> {
    order: Vec<K>,
    rows: HashMap<K, V>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            rows: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + std::hash::Hash + std::fmt::Display, V: Clone> Table<K, V> {
    fn insert(&mut self, kind: RecordKind, key: K, value: &V) -> Result<(), StorageError> {
        if self.rows.contains_key(&key) {
            return Err(StorageError::InsertFailed {
                kind,
                reason: format!("{} already exists", key),
            });
        }
        self.order.push(key);
        self.rows.insert(key, value.clone());
        Ok(())
    }

    fn update(&mut self, kind: RecordKind, key: K, value: &V) -> Result<(), StorageError> {
        let row = self.rows.get_mut(&key).ok_or_else(|| StorageError::NotFound {
            kind,
            id: key.to_string(),
        })?;
        *row = value.clone();
        Ok(())
    }

    fn get(&self, key: &K) -> Option<V> {
        self.rows.get(key).cloned()
    }

    fn list(&self) -> Vec<V> {
        self.order
            .iter()
            .filter_map(|k| self.rows.get(k).cloned())
            .collect()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, AuraError> {
    lock.read()
        .map_err(|_| AuraError::Storage(StorageError::LockPoisoned))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, AuraError> {
    lock.write()
        .map_err(|_| AuraError::Storage(StorageError::LockPoisoned))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.read().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn activity_count(&self) -> usize {
        self.activity.read().map(|a| a.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SwarmStore for MemoryStore {
    async fn agent_insert(&self, agent: &Agent) -> AuraResult<()> {
        write(&self.agents)?.insert(RecordKind::Agent, agent.id, agent)?;
        Ok(())
    }

    async fn agent_update(&self, agent: &Agent) -> AuraResult<()> {
        write(&self.agents)?.update(RecordKind::Agent, agent.id, agent)?;
        Ok(())
    }

    async fn agent_get(&self, id: AgentId) -> AuraResult<Option<Agent>> {
        Ok(read(&self.agents)?.get(&id))
    }

    async fn agent_list(&self) -> AuraResult<Vec<Agent>> {
        Ok(read(&self.agents)?.list())
    }

    async fn permission_insert(&self, request: &PermissionRequest) -> AuraResult<()> {
        write(&self.permissions)?.insert(RecordKind::PermissionRequest, request.id, request)?;
        Ok(())
    }

    async fn permission_update(&self, request: &PermissionRequest) -> AuraResult<()> {
        write(&self.permissions)?.update(RecordKind::PermissionRequest, request.id, request)?;
        Ok(())
    }

    async fn permission_get(&self, id: PermissionRequestId) -> AuraResult<Option<PermissionRequest>> {
        Ok(read(&self.permissions)?.get(&id))
    }

    async fn permission_list(&self) -> AuraResult<Vec<PermissionRequest>> {
        Ok(read(&self.permissions)?.list())
    }

    async fn activity_insert(&self, entry: &ActivityLogEntry) -> AuraResult<()> {
        write(&self.activity)?.push(entry.clone());
        Ok(())
    }

    async fn activity_list(
        &self,
        agent_id: Option<AgentId>,
        limit: Option<usize>,
    ) -> AuraResult<Vec<ActivityLogEntry>> {
        let entries = read(&self.activity)?;
        let mut matching: Vec<ActivityLogEntry> = entries
            .iter()
            .filter(|e| agent_id.map_or(true, |id| e.agent_id == id))
            .cloned()
            .collect();
        if let Some(limit) = limit {
            let skip = matching.len().saturating_sub(limit);
            matching.drain(..skip);
        }
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::{ActivityResult, AgentStatus, EntityIdType, PermissionStatus};

    #[tokio::test]
    async fn test_agent_insert_get_update() {
        let store = MemoryStore::new();
        let mut agent = Agent::new(None, "quantum", 0.8);
        store.agent_insert(&agent).await.unwrap();

        agent.status = AgentStatus::Active;
        store.agent_update(&agent).await.unwrap();

        let fetched = store.agent_get(agent.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, AgentStatus::Active);
        assert_eq!(store.agent_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        let agent = Agent::new(None, "code", 0.8);
        store.agent_insert(&agent).await.unwrap();
        let err = store.agent_insert(&agent).await.unwrap_err();
        assert!(matches!(
            err,
            AuraError::Storage(StorageError::InsertFailed { kind: RecordKind::Agent, .. })
        ));
    }

    #[tokio::test]
    async fn test_update_of_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let request = PermissionRequest::new(AgentId::now_v7(), "deploy", "ibm_fez", "why");
        let err = store.permission_update(&request).await.unwrap_err();
        assert!(matches!(err, AuraError::Storage(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_agent_list_keeps_insertion_order() {
        let store = MemoryStore::new();
        let names = ["a", "b", "c"];
        for name in names {
            store
                .agent_insert(&Agent::new(Some(name.to_string()), "general", 0.8))
                .await
                .unwrap();
        }
        let listed: Vec<String> = store
            .agent_list()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(listed, names);
    }

    #[tokio::test]
    async fn test_permission_roundtrip() {
        let store = MemoryStore::new();
        let mut request = PermissionRequest::new(AgentId::now_v7(), "deploy", "ibm_fez", "why");
        store.permission_insert(&request).await.unwrap();
        request.status = PermissionStatus::Denied;
        store.permission_update(&request).await.unwrap();
        let fetched = store.permission_get(request.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, PermissionStatus::Denied);
        assert_eq!(store.permission_list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_activity_list_filters_and_limits() {
        let store = MemoryStore::new();
        let a = AgentId::now_v7();
        let b = AgentId::now_v7();
        for i in 0..5 {
            let entry = ActivityLogEntry::new(a, format!("task-{}", i), ActivityResult::Success, "", 5.0);
            store.activity_insert(&entry).await.unwrap();
        }
        store
            .activity_insert(&ActivityLogEntry::new(b, "other", ActivityResult::Failure, "", 5.0))
            .await
            .unwrap();

        let recent = store.activity_list(Some(a), Some(2)).await.unwrap();
        let actions: Vec<&str> = recent.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, ["task-3", "task-4"]);
        assert_eq!(store.activity_list(None, None).await.unwrap().len(), 6);
        assert_eq!(store.activity_count(), 6);
    }
}
