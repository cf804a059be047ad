//! Multi-agent goal coordination.

use crate::backend::{reported_impact, reports_success};
use crate::dispatcher::{paths, Orchestrator};
use aura_core::{
    AgentId, AuraResult, DispatchError, Outcome, DEFAULT_IMPACT, GENERAL_SPECIALIZATION,
};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::Instant;

/// Activity action recorded for each coordinated subtask.
pub const SUBTASK_ACTION: &str = "execute_subtask";

/// Result of one subtask.
#[derive(Debug, Clone, Serialize)]
pub struct SubtaskReport {
    pub index: usize,
    pub agent_id: AgentId,
    pub task: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl SubtaskReport {
    /// The failure as a typed error, if this subtask failed.
    pub fn failure(&self) -> Option<DispatchError> {
        if self.success {
            return None;
        }
        Some(DispatchError::SubtaskFailed {
            index: self.index,
            agent_id: self.agent_id,
            reason: self
                .error
                .clone()
                .unwrap_or_else(|| "subtask reported failure".to_string()),
        })
    }
}

/// Aggregate over every subtask of a goal. `success` holds only if every
/// subtask succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinationResult {
    pub summary: String,
    pub success: bool,
    pub results: Vec<SubtaskReport>,
}

impl CoordinationResult {
    fn from_reports(results: Vec<SubtaskReport>) -> Self {
        let failed = results.iter().filter(|r| !r.success).count();
        let summary = if failed == 0 {
            format!("Completed {} subtasks", results.len())
        } else {
            format!("{} of {} subtasks failed", failed, results.len())
        };
        Self {
            summary,
            success: failed == 0,
            results,
        }
    }

    pub fn failures(&self) -> Vec<DispatchError> {
        self.results.iter().filter_map(SubtaskReport::failure).collect()
    }

    /// Outputs of the subtasks that succeeded.
    pub fn partial_results(&self) -> impl Iterator<Item = &Value> {
        self.results
            .iter()
            .filter(|r| r.success)
            .filter_map(|r| r.result.as_ref())
    }
}

impl Orchestrator {
    /// Split `goal` into subtasks, assign subtask `i` to
    /// `agents[i % agents.len()]`, run them concurrently, and aggregate.
    ///
    /// With no agents given, a `general` agent is selected (and spawned if
    /// the registry has none).
    pub async fn coordinate_multi_agent(
        &self,
        goal: &str,
        agents: &[AgentId],
    ) -> AuraResult<CoordinationResult> {
        let subtasks = self.decomposer.decompose(goal);
        if subtasks.is_empty() {
            return Err(DispatchError::MissingEntity {
                action: "coordinate".to_string(),
                entity: "goal".to_string(),
            }
            .into());
        }

        let agents: Vec<AgentId> = if agents.is_empty() {
            vec![self.registry.select(GENERAL_SPECIALIZATION).await.id]
        } else {
            agents.to_vec()
        };

        tracing::info!(
            subtasks = subtasks.len(),
            agents = agents.len(),
            "Coordinating goal"
        );
        // Subtasks sharing an agent overwrite its current_task, and the first
        // to finish marks the agent idle while the others are still running.
        let runs = subtasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| self.run_subtask(index, agents[index % agents.len()], task));
        let reports = join_all(runs).await;

        Ok(CoordinationResult::from_reports(reports))
    }

    /// Run one subtask. Agent state always leaves `Active`, whatever
    /// happens to the call.
    async fn run_subtask(&self, index: usize, agent_id: AgentId, task: String) -> SubtaskReport {
        let started = Instant::now();
        let mut report = SubtaskReport {
            index,
            agent_id,
            task,
            success: false,
            result: None,
            error: None,
            elapsed_ms: 0,
        };

        if let Err(e) = self.registry.begin_task(agent_id, &report.task).await {
            report.error = Some(e.to_string());
            tracing::warn!(agent_id = %agent_id, index, error = %e, "Subtask could not start");
            return report;
        }

        let path = paths::agent_execute(&agent_id.to_string());
        let call = self.backend.post(&path, json!({ "task": report.task }));
        let result = match tokio::time::timeout(self.task_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout {
                endpoint: path.clone(),
                timeout_ms: self.task_timeout.as_millis() as u64,
            }),
        };
        let elapsed = started.elapsed();
        report.elapsed_ms = elapsed.as_millis() as u64;

        let impact = match &result {
            Ok(payload) => {
                report.success = reports_success(payload);
                if !report.success {
                    report.error = Some(payload_error(payload));
                }
                report.result = Some(payload.clone());
                reported_impact(payload).unwrap_or(DEFAULT_IMPACT)
            }
            Err(e) => {
                report.error = Some(e.to_string());
                DEFAULT_IMPACT
            }
        };

        let details = report.error.clone().unwrap_or_else(|| report.task.clone());
        if let Err(e) = self
            .registry
            .finish_task(
                agent_id,
                SUBTASK_ACTION,
                Outcome::from_success(report.success),
                impact,
                Some(elapsed),
                &details,
            )
            .await
        {
            tracing::warn!(agent_id = %agent_id, index, error = %e, "Failed to record subtask outcome");
        }

        if !report.success {
            tracing::warn!(
                agent_id = %agent_id,
                index,
                error = report.error.as_deref().unwrap_or_default(),
                "Subtask failed"
            );
        }
        report
    }
}

fn payload_error(payload: &Value) -> String {
    payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("subtask reported failure")
        .to_string()
}
