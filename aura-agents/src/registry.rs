//! Agent registry and selection.
//!
//! The registry is a cache over the store: reads are served locally and every
//! mutation is queued for the store. A single writer task applies queued
//! writes in order; a failed write is logged rather than failing the
//! operation. Each agent sits behind its own lock so concurrent updates to
//! one agent serialize without blocking the others.

use crate::activity::ActivityLog;
use crate::trust::{self, TrustChange};
use aura_core::{
    ActivityLogEntry, Agent, AgentError, AgentId, AgentStatus, AuraResult, Outcome,
    DEFAULT_TRUST, GENERAL_SPECIALIZATION,
};
use aura_storage::SwarmStore;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};

type Slot = Arc<Mutex<Agent>>;

#[derive(Default)]
struct Slots {
    /// First-seen order, used to break selection ties.
    order: Vec<AgentId>,
    by_id: HashMap<AgentId, Slot>,
}

impl Slots {
    fn insert(&mut self, agent: Agent) -> bool {
        if self.by_id.contains_key(&agent.id) {
            return false;
        }
        self.order.push(agent.id);
        self.by_id.insert(agent.id, Arc::new(Mutex::new(agent)));
        true
    }

    fn ordered(&self) -> impl Iterator<Item = &Slot> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }
}

// ============================================================================
// STORE MIRROR
// ============================================================================

enum StoreWrite {
    Insert(Agent),
    Update(Agent),
    Flush(oneshot::Sender<()>),
}

/// Ordered, send-and-forget agent writes. The writer task starts on the
/// first write and ends when the registry is dropped.
struct StoreMirror {
    store: Arc<dyn SwarmStore>,
    queue: OnceCell<mpsc::UnboundedSender<StoreWrite>>,
}

impl StoreMirror {
    fn new(store: Arc<dyn SwarmStore>) -> Self {
        Self {
            store,
            queue: OnceCell::new(),
        }
    }

    fn send(&self, write: StoreWrite) {
        let queue = self.queue.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(drain(self.store.clone(), rx));
            tx
        });
        if queue.send(write).is_err() {
            tracing::warn!("Agent store writer stopped; dropping write");
        }
    }

    async fn flush(&self) {
        let Some(queue) = self.queue.get() else {
            return;
        };
        let (done, wait) = oneshot::channel();
        if queue.send(StoreWrite::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

async fn drain(store: Arc<dyn SwarmStore>, mut queue: mpsc::UnboundedReceiver<StoreWrite>) {
    while let Some(write) = queue.recv().await {
        match write {
            StoreWrite::Insert(agent) => {
                if let Err(e) = store.agent_insert(&agent).await {
                    tracing::warn!(agent_id = %agent.id, error = %e, "Failed to persist new agent");
                }
            }
            StoreWrite::Update(agent) => {
                if let Err(e) = store.agent_update(&agent).await {
                    tracing::warn!(agent_id = %agent.id, error = %e, "Failed to persist agent update");
                }
            }
            StoreWrite::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Result of a completed task as applied to an agent.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub agent: Agent,
    pub trust: TrustChange,
}

/// Process-local table of swarm agents.
pub struct AgentRegistry {
    slots: RwLock<Slots>,
    store: Arc<dyn SwarmStore>,
    mirror: StoreMirror,
    activity: ActivityLog,
}

impl AgentRegistry {
    pub fn new(store: Arc<dyn SwarmStore>) -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
            activity: ActivityLog::new(store.clone()),
            mirror: StoreMirror::new(store.clone()),
            store,
        }
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn store(&self) -> &Arc<dyn SwarmStore> {
        &self.store
    }

    /// Wait until every agent write queued so far has reached the store.
    pub async fn flush_store(&self) {
        self.mirror.flush().await;
    }

    /// Load agents and activity from the store, keeping any agent already
    /// cached. Returns the number of agents added.
    pub async fn rehydrate(&self) -> AuraResult<usize> {
        let stored = self.store.agent_list().await?;
        let added = {
            let mut slots = self.slots.write().await;
            stored
                .into_iter()
                .filter(|agent| slots.insert(agent.clone()))
                .count()
        };
        let entries = self.activity.rehydrate().await?;
        tracing::info!(agents = added, activity_entries = entries, "Rehydrated agent registry");
        Ok(added)
    }

    // ========================================================================
    // SPAWN & LOOKUP
    // ========================================================================

    /// Register a new idle agent and mirror it to the store.
    ///
    /// A blank specialization becomes `general`.
    pub async fn spawn(
        &self,
        name: Option<String>,
        specialization: &str,
        trust: f64,
    ) -> AuraResult<Agent> {
        if !(0.0..=1.0).contains(&trust) {
            return Err(AgentError::InvalidTrust { trust }.into());
        }
        let agent = Agent::new(name, normalize_specialization(specialization), trust);
        {
            // Queue the insert before the agent is visible to mutators.
            let mut slots = self.slots.write().await;
            self.persist_insert(&agent);
            slots.insert(agent.clone());
        }
        tracing::info!(
            agent_id = %agent.id,
            name = %agent.name,
            specialization = %agent.specialization,
            trust = agent.trust,
            "Spawned agent"
        );
        Ok(agent)
    }

    pub async fn get(&self, id: AgentId) -> Option<Agent> {
        let slot = self.slot(id).await?;
        let agent = slot.lock().await;
        Some(agent.clone())
    }

    pub async fn contains(&self, id: AgentId) -> bool {
        self.slots.read().await.by_id.contains_key(&id)
    }

    /// Agents in first-seen order. Idle agents are left out unless
    /// `include_idle` is set.
    pub async fn list(&self, include_idle: bool) -> Vec<Agent> {
        let slots: Vec<Slot> = self.slots.read().await.ordered().cloned().collect();
        let mut agents = Vec::with_capacity(slots.len());
        for slot in slots {
            let agent = slot.lock().await;
            if include_idle || !agent.status.is_idle() {
                agents.push(agent.clone());
            }
        }
        agents
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn count_with_status(&self, status: AgentStatus) -> usize {
        self.list(true)
            .await
            .iter()
            .filter(|a| a.status == status)
            .count()
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    /// Pick the best agent for `specialization`, spawning one if none fits.
    ///
    /// Candidates are exact specialization matches, else `general` agents.
    /// They rank by `trust × (2 if idle else 1)`; ties go to the agent seen
    /// first. With no candidate at all a new agent is spawned at the default
    /// trust, so this call mutates the registry and never fails.
    pub async fn select(&self, specialization: &str) -> Agent {
        let specialization = normalize_specialization(specialization);
        {
            let slots = self.slots.read().await;
            if let Some(agent) = best_candidate(&slots, &specialization).await {
                return agent;
            }
        }

        let spawned = {
            let mut slots = self.slots.write().await;
            // Another caller may have spawned while we waited for the lock.
            if let Some(agent) = best_candidate(&slots, &specialization).await {
                return agent;
            }
            let agent = Agent::new(None, specialization.as_str(), DEFAULT_TRUST);
            self.persist_insert(&agent);
            slots.insert(agent.clone());
            agent
        };
        tracing::info!(
            agent_id = %spawned.id,
            specialization = %spawned.specialization,
            "No candidate agent, spawned one"
        );
        spawned
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Mark the agent active on `task`.
    pub async fn begin_task(&self, id: AgentId, task: &str) -> AuraResult<Agent> {
        self.mutate(id, |agent| agent.begin_task(task)).await.map(|(a, _)| a)
    }

    /// Set the agent's status directly, clearing any task pointer unless the
    /// new status is `Active`.
    pub async fn set_status(&self, id: AgentId, status: AgentStatus) -> AuraResult<Agent> {
        self.mutate(id, |agent| {
            agent.status = status;
            if status != AgentStatus::Active {
                agent.current_task = None;
            }
        })
        .await
        .map(|(a, _)| a)
    }

    /// Apply the trust rule for a completed `action` and append one activity
    /// entry.
    pub async fn record_outcome(
        &self,
        id: AgentId,
        action: &str,
        outcome: Outcome,
        impact: f64,
        elapsed: Option<Duration>,
        details: &str,
    ) -> AuraResult<TaskRecord> {
        let (agent, change) = self
            .mutate(id, |agent| trust::apply(agent, outcome, impact, elapsed))
            .await?;
        self.log_outcome(&agent, action, outcome, impact, details, change)
            .await;
        Ok(TaskRecord { agent, trust: change })
    }

    /// Leave `Active` (to `Idle` on success, `Error` on failure) and apply
    /// the trust rule, as one update.
    pub async fn finish_task(
        &self,
        id: AgentId,
        action: &str,
        outcome: Outcome,
        impact: f64,
        elapsed: Option<Duration>,
        details: &str,
    ) -> AuraResult<TaskRecord> {
        let (agent, change) = self
            .mutate(id, |agent| {
                agent.finish_task(outcome);
                trust::apply(agent, outcome, impact, elapsed)
            })
            .await?;
        self.log_outcome(&agent, action, outcome, impact, details, change)
            .await;
        Ok(TaskRecord { agent, trust: change })
    }

    /// Add `action` to the agent's permission set. Returns false when the
    /// agent already held it.
    pub(crate) async fn grant_permission(&self, id: AgentId, action: &str) -> AuraResult<bool> {
        let (_, added) = self
            .mutate(id, |agent| agent.permissions.insert(action.to_string()))
            .await?;
        Ok(added)
    }

    async fn slot(&self, id: AgentId) -> Option<Slot> {
        self.slots.read().await.by_id.get(&id).cloned()
    }

    /// Lock one agent, apply `f`, and queue the snapshot while still holding
    /// the lock so store writes for an agent land in order.
    async fn mutate<R>(&self, id: AgentId, f: impl FnOnce(&mut Agent) -> R) -> AuraResult<(Agent, R)> {
        let slot = self
            .slot(id)
            .await
            .ok_or(AgentError::NotRegistered { agent_id: id })?;
        let mut agent = slot.lock().await;
        let result = f(&mut agent);
        let snapshot = agent.clone();
        self.persist_update(&snapshot);
        Ok((snapshot, result))
    }

    async fn log_outcome(
        &self,
        agent: &Agent,
        action: &str,
        outcome: Outcome,
        impact: f64,
        details: &str,
        change: TrustChange,
    ) {
        tracing::info!(
            agent_id = %agent.id,
            action,
            success = outcome.is_success(),
            trust_before = change.previous,
            trust_after = change.current,
            "Updated agent trust"
        );
        self.activity
            .append(ActivityLogEntry::new(
                agent.id,
                action,
                outcome.into(),
                details,
                impact,
            ))
            .await;
    }

    fn persist_insert(&self, agent: &Agent) {
        self.mirror.send(StoreWrite::Insert(agent.clone()));
    }

    fn persist_update(&self, agent: &Agent) {
        self.mirror.send(StoreWrite::Update(agent.clone()));
    }
}

fn normalize_specialization(specialization: &str) -> String {
    let trimmed = specialization.trim();
    if trimmed.is_empty() {
        GENERAL_SPECIALIZATION.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Highest-scoring exact match, else highest-scoring `general` agent.
async fn best_candidate(slots: &Slots, specialization: &str) -> Option<Agent> {
    let mut exact: Option<Agent> = None;
    let mut general: Option<Agent> = None;
    for slot in slots.ordered() {
        let agent = slot.lock().await;
        let bucket = if agent.specialization == specialization {
            &mut exact
        } else if agent.specialization == GENERAL_SPECIALIZATION {
            &mut general
        } else {
            continue;
        };
        if bucket
            .as_ref()
            .map_or(true, |best| agent.selection_score() > best.selection_score())
        {
            *bucket = Some(agent.clone());
        }
    }
    exact.or(general)
}
