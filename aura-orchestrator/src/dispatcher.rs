//! Intent dispatch.
//!
//! Every known [`Action`] maps to one branch; anything else is forwarded to
//! the generic execution endpoint with the whole intent attached.

use crate::backend::{reported_impact, reports_success, ExecutionBackend};
use crate::decompose::{SingleTask, TaskDecomposer};
use crate::status::SwarmStatus;
use aura_agents::{AgentRegistry, PermissionWorkflow, RepeatedActionPolicy};
use aura_core::{
    Action, Agent, AuraResult, CommandIntent, DispatchError, Outcome, PermissionRequest,
    DEFAULT_IMPACT, DEFAULT_TRUST, GENERAL_SPECIALIZATION,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// DEFAULTS
// ============================================================================

pub const DEFAULT_BACKEND: &str = "ibm_fez";
pub const DEFAULT_SHOTS: u64 = 1024;
pub const DEFAULT_LANGUAGE: &str = "typescript";
pub const DEFAULT_MUTATION_FILENAME: &str = "generated.tsx";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Mutation via AURA Swarm CLI";
pub const OPTIMIZATION_GOAL: &str = "minimize_gamma";
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(5);

pub const QUANTUM_SPECIALIZATION: &str = "quantum";
pub const CODE_SPECIALIZATION: &str = "code";

pub(crate) mod paths {
    pub const DEPLOY: &str = "/api/organisms/deploy";
    pub const OPTIMIZE: &str = "/api/quantum/optimize";
    pub const JOBS: &str = "/api/quantum/jobs";
    pub const GENERATE_CODE: &str = "/api/swarm/generate-code";
    pub const COMMIT_MUTATION: &str = "/api/swarm/commit-mutation";
    pub const PASS_THROUGH: &str = "/api/nlp2/execute";

    pub fn agent_execute(agent_id: &str) -> String {
        format!("/api/swarm/agents/{}/execute", agent_id)
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// What a dispatched intent produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Deployed {
        response: Value,
    },
    AgentSpawned {
        agent: Agent,
    },
    AgentList {
        agents: Vec<Agent>,
    },
    CircuitOptimized {
        agent: Agent,
        response: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        permission_request: Option<PermissionRequest>,
    },
    JobSubmitted {
        response: Value,
    },
    CodeGenerated {
        agent: Agent,
        response: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        permission_request: Option<PermissionRequest>,
    },
    Status {
        status: SwarmStatus,
    },
    MutationCommitted {
        response: Value,
    },
    PassedThrough {
        action: Action,
        response: Value,
    },
}

impl DispatchOutcome {
    /// False when a backend payload reported `"success": false`.
    pub fn is_success(&self) -> bool {
        match self {
            DispatchOutcome::Deployed { response }
            | DispatchOutcome::CircuitOptimized { response, .. }
            | DispatchOutcome::JobSubmitted { response }
            | DispatchOutcome::CodeGenerated { response, .. }
            | DispatchOutcome::MutationCommitted { response }
            | DispatchOutcome::PassedThrough { response, .. } => reports_success(response),
            DispatchOutcome::AgentSpawned { .. }
            | DispatchOutcome::AgentList { .. }
            | DispatchOutcome::Status { .. } => true,
        }
    }
}

/// Agent-routed call result before it is wrapped into an outcome.
struct Routed {
    agent: Agent,
    response: Value,
    permission_request: Option<PermissionRequest>,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Routes classified intents to the registry or the execution backend.
pub struct Orchestrator {
    pub(crate) backend: Arc<dyn ExecutionBackend>,
    pub(crate) registry: Arc<AgentRegistry>,
    pub(crate) permissions: Arc<PermissionWorkflow>,
    policy: RepeatedActionPolicy,
    pub(crate) decomposer: Arc<dyn TaskDecomposer>,
    pub(crate) task_timeout: Duration,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn ExecutionBackend>, registry: Arc<AgentRegistry>) -> Self {
        let permissions = Arc::new(PermissionWorkflow::new(registry.clone()));
        let policy = RepeatedActionPolicy::new(registry.clone(), permissions.clone());
        Self {
            backend,
            registry,
            permissions,
            policy,
            decomposer: Arc::new(SingleTask),
            task_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    pub fn with_decomposer(mut self, decomposer: Arc<dyn TaskDecomposer>) -> Self {
        self.decomposer = decomposer;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_repeat_threshold(mut self, threshold: usize) -> Self {
        self.policy = RepeatedActionPolicy::new(self.registry.clone(), self.permissions.clone())
            .with_threshold(threshold);
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn permissions(&self) -> &Arc<PermissionWorkflow> {
        &self.permissions
    }

    pub fn backend(&self) -> &Arc<dyn ExecutionBackend> {
        &self.backend
    }

    /// Reload agents, activity and permission requests from the store.
    pub async fn rehydrate(&self) -> AuraResult<()> {
        let agents = self.registry.rehydrate().await?;
        let requests = self.permissions.rehydrate().await?;
        tracing::info!(agents, requests, "Rehydrated swarm state");
        Ok(())
    }

    /// Dispatch one classified intent.
    pub async fn execute(&self, intent: &CommandIntent) -> AuraResult<DispatchOutcome> {
        tracing::debug!(
            action = %intent.action,
            confidence = intent.confidence,
            "Dispatching intent"
        );
        let entities = &intent.entities;
        match &intent.action {
            Action::DeployOrganism => {
                let file = entities.text("file").ok_or_else(|| DispatchError::MissingEntity {
                    action: intent.action.to_string(),
                    entity: "file".to_string(),
                })?;
                let backend = entities.text("backend").unwrap_or(DEFAULT_BACKEND);
                let shots = entities.number("shot").unwrap_or(DEFAULT_SHOTS);
                let response = self.deploy(Path::new(file), backend, shots).await?;
                Ok(DispatchOutcome::Deployed { response })
            }
            Action::SpawnAgent => {
                let name = entities
                    .text("name")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Agent-{}", chrono::Utc::now().timestamp_millis()));
                let specialization = entities
                    .text("specialization")
                    .unwrap_or(GENERAL_SPECIALIZATION);
                let agent = self
                    .registry
                    .spawn(Some(name), specialization, DEFAULT_TRUST)
                    .await?;
                Ok(DispatchOutcome::AgentSpawned { agent })
            }
            Action::ListAgents => {
                let include_idle = mentions_all(&intent.raw_command);
                let agents = self.registry.list(include_idle).await;
                Ok(DispatchOutcome::AgentList { agents })
            }
            Action::OptimizeCircuit => {
                let backend = entities.text("backend").unwrap_or(DEFAULT_BACKEND).to_string();
                let routed = self
                    .run_routed(&intent.action, QUANTUM_SPECIALIZATION, paths::OPTIMIZE, &backend, |agent| {
                        let mut body = Map::new();
                        body.insert("agent_id".into(), json!(agent.id.to_string()));
                        body.insert("backend".into(), json!(backend));
                        body.insert("optimization_goal".into(), json!(OPTIMIZATION_GOAL));
                        for (key, value) in entities.iter() {
                            body.insert(key.clone(), value.clone());
                        }
                        Value::Object(body)
                    })
                    .await?;
                Ok(DispatchOutcome::CircuitOptimized {
                    agent: routed.agent,
                    response: routed.response,
                    permission_request: routed.permission_request,
                })
            }
            Action::RunQuantumJob => {
                let circuit = entities
                    .get("circuit")
                    .or_else(|| entities.get("qasm"))
                    .or_else(|| entities.get("text"))
                    .cloned()
                    .unwrap_or(Value::Null);
                let body = json!({
                    "circuit_qasm": circuit,
                    "backend": entities.text("backend").unwrap_or(DEFAULT_BACKEND),
                    "shots": entities.number("shot").unwrap_or(DEFAULT_SHOTS),
                });
                let response = self.backend.post(paths::JOBS, body).await?;
                Ok(DispatchOutcome::JobSubmitted { response })
            }
            Action::GenerateCode => {
                let language = entities.text("language").unwrap_or(DEFAULT_LANGUAGE).to_string();
                let prompt = entities
                    .text("text")
                    .or_else(|| entities.text("description"))
                    .unwrap_or(intent.raw_command.as_str())
                    .to_string();
                let routed = self
                    .run_routed(&intent.action, CODE_SPECIALIZATION, paths::GENERATE_CODE, &language, |agent| {
                        json!({
                            "agent_id": agent.id.to_string(),
                            "prompt": prompt,
                            "language": language,
                        })
                    })
                    .await?;
                Ok(DispatchOutcome::CodeGenerated {
                    agent: routed.agent,
                    response: routed.response,
                    permission_request: routed.permission_request,
                })
            }
            Action::GetStatus => {
                let status = SwarmStatus::fetch(self.backend.as_ref(), &self.registry).await;
                Ok(DispatchOutcome::Status { status })
            }
            Action::CommitMutation => {
                let body = json!({
                    "code": entities.get("code").or_else(|| entities.get("text")).cloned().unwrap_or(Value::Null),
                    "filename": entities.text("filename").unwrap_or(DEFAULT_MUTATION_FILENAME),
                    "commit_message": entities.text("message").unwrap_or(DEFAULT_COMMIT_MESSAGE),
                });
                let response = self.backend.post(paths::COMMIT_MUTATION, body).await?;
                Ok(DispatchOutcome::MutationCommitted { response })
            }
            Action::Other(_) => {
                let body = json!({
                    "command": intent.raw_command,
                    "intent": {
                        "action": intent.action,
                        "entities": intent.entities,
                        "confidence": intent.confidence,
                    },
                });
                let response = self.backend.post(paths::PASS_THROUGH, body).await?;
                Ok(DispatchOutcome::PassedThrough {
                    action: intent.action.clone(),
                    response,
                })
            }
        }
    }

    /// Read an organism artifact and submit it for deployment.
    pub async fn deploy(&self, file: &Path, backend: &str, shots: u64) -> AuraResult<Value> {
        let dna_code = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| DispatchError::ArtifactUnreadable {
                path: file.display().to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(file = %file.display(), backend, shots, "Deploying organism");
        let body = json!({
            "dna_code": dna_code,
            "backend": backend,
            "shots": shots,
        });
        Ok(self.backend.post(paths::DEPLOY, body).await?)
    }

    /// Select an agent, run the call as its task, and feed the result back
    /// into trust, performance and the repeated-action policy.
    async fn run_routed(
        &self,
        action: &Action,
        specialization: &str,
        path: &str,
        resource: &str,
        body: impl FnOnce(&Agent) -> Value,
    ) -> AuraResult<Routed> {
        let label = action.as_label();
        let agent = self.registry.select(specialization).await;
        self.registry.begin_task(agent.id, label).await?;

        let started = Instant::now();
        let result = self.backend.post(path, body(&agent)).await;
        let elapsed = started.elapsed();

        let (outcome, impact, details) = match &result {
            Ok(response) => (
                Outcome::from_success(reports_success(response)),
                reported_impact(response).unwrap_or(DEFAULT_IMPACT),
                format!("{} via {}", label, path),
            ),
            Err(e) => (Outcome::Failure, DEFAULT_IMPACT, e.to_string()),
        };
        let record = self
            .registry
            .finish_task(agent.id, label, outcome, impact, Some(elapsed), &details)
            .await?;

        let permission_request = match self.policy.evaluate(agent.id, label, resource).await {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(agent_id = %agent.id, error = %e, "Permission policy evaluation failed");
                None
            }
        };

        let response = result?;
        Ok(Routed {
            agent: record.agent,
            response,
            permission_request,
        })
    }
}

/// True when the command asks for every agent, idle ones included.
fn mentions_all(command: &str) -> bool {
    command
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case("all"))
}
