//! Rendering command results for the terminal.

use aura_agents::ActivityInsights;
use aura_core::{Agent, HealthBand, PermissionRequest};
use aura_orchestrator::{CoordinationResult, DispatchOutcome, SwarmStatus};
use crossterm::style::{StyledContent, Stylize};
use serde_json::Value;
use std::fmt::Write as _;

/// A finished command's result.
#[derive(Debug, Clone)]
pub enum Report {
    Dispatch(DispatchOutcome),
    Agent(Agent),
    Agents(Vec<Agent>),
    Status(SwarmStatus),
    Suggestions(Vec<&'static str>),
    Coordination(CoordinationResult),
    Insights(ActivityInsights),
    Permission(PermissionRequest),
    Permissions(Vec<PermissionRequest>),
}

impl Report {
    /// Whether the command should exit successfully.
    pub fn is_success(&self) -> bool {
        match self {
            Report::Dispatch(outcome) => outcome.is_success(),
            Report::Coordination(result) => result.success,
            _ => true,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Report::Dispatch(outcome) => serde_json::to_string_pretty(outcome),
            Report::Agent(agent) => serde_json::to_string_pretty(agent),
            Report::Agents(agents) => serde_json::to_string_pretty(agents),
            Report::Status(status) => serde_json::to_string_pretty(status),
            Report::Suggestions(suggestions) => serde_json::to_string_pretty(suggestions),
            Report::Coordination(result) => serde_json::to_string_pretty(result),
            Report::Insights(insights) => serde_json::to_string_pretty(insights),
            Report::Permission(request) => serde_json::to_string_pretty(request),
            Report::Permissions(requests) => serde_json::to_string_pretty(requests),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Report::Dispatch(outcome) => dispatch_text(outcome),
            Report::Agent(agent) => format!("{} {}", "Spawned".green().bold(), agent_line(agent)),
            Report::Agents(agents) => agents_text(agents),
            Report::Status(status) => status_text(status),
            Report::Suggestions(suggestions) => {
                if suggestions.is_empty() {
                    "No matching commands".dark_grey().to_string()
                } else {
                    suggestions.join("\n")
                }
            }
            Report::Coordination(result) => coordination_text(result),
            Report::Insights(insights) => insights_text(insights),
            Report::Permission(request) => permission_line(request),
            Report::Permissions(requests) => {
                if requests.is_empty() {
                    "No permission requests".dark_grey().to_string()
                } else {
                    requests.iter().map(permission_line).collect::<Vec<_>>().join("\n")
                }
            }
        }
    }
}

pub fn banded(text: String, band: HealthBand) -> StyledContent<String> {
    match band {
        HealthBand::Good => text.green(),
        HealthBand::Fair => text.yellow(),
        HealthBand::Poor => text.red(),
    }
}

fn agent_line(agent: &Agent) -> String {
    format!(
        "{}  {:<20} {:<12} {:<10} trust {:.3}  tasks {}",
        agent.id,
        agent.name,
        agent.specialization,
        agent.status,
        agent.trust,
        agent.performance.tasks_completed
    )
}

fn agents_text(agents: &[Agent]) -> String {
    if agents.is_empty() {
        return "No active agents (use --all to include idle ones)"
            .dark_grey()
            .to_string();
    }
    let mut out = format!("{} agent(s)\n", agents.len());
    for agent in agents {
        out.push_str(&agent_line(agent));
        if let Some(task) = &agent.current_task {
            let _ = write!(out, "  [{}]", task);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn response_text(label: &str, response: &Value, ok: bool) -> String {
    let head = if ok { label.green().bold() } else { label.red().bold() };
    let body = serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string());
    format!("{}\n{}", head, body)
}

fn dispatch_text(outcome: &DispatchOutcome) -> String {
    let ok = outcome.is_success();
    match outcome {
        DispatchOutcome::Deployed { response } => response_text("Deployed", response, ok),
        DispatchOutcome::AgentSpawned { agent } => {
            format!("{} {}", "Spawned".green().bold(), agent_line(agent))
        }
        DispatchOutcome::AgentList { agents } => agents_text(agents),
        DispatchOutcome::CircuitOptimized {
            agent,
            response,
            permission_request,
        }
        | DispatchOutcome::CodeGenerated {
            agent,
            response,
            permission_request,
        } => {
            let label = if matches!(outcome, DispatchOutcome::CircuitOptimized { .. }) {
                "Circuit optimized"
            } else {
                "Code generated"
            };
            let mut out = format!(
                "{}\nby {}\n",
                response_text(label, response, ok),
                agent_line(agent)
            );
            if let Some(request) = permission_request {
                let _ = write!(out, "{} {}", "Permission requested:".yellow(), permission_line(request));
            }
            out.trim_end().to_string()
        }
        DispatchOutcome::JobSubmitted { response } => response_text("Job submitted", response, ok),
        DispatchOutcome::Status { status } => status_text(status),
        DispatchOutcome::MutationCommitted { response } => {
            response_text("Mutation committed", response, ok)
        }
        DispatchOutcome::PassedThrough { action, response } => {
            response_text(&format!("Executed {}", action.as_label()), response, ok)
        }
    }
}

fn status_text(status: &SwarmStatus) -> String {
    let band = HealthBand::from_score(status.health);
    let source = if status.live { "live" } else { "placeholder" };
    let m = &status.metrics;
    format!(
        "Health  {} ({})\nPhi     {:.4}\nLambda  {:.6e}\nGamma   {:.4}\nW2      {:.4}\nAgents  {} active\nJobs    {}\nBackend {}\nSource  {}",
        banded(format!("{:.1}%", status.health * 100.0), band),
        band,
        m.phi,
        m.lambda,
        m.gamma,
        m.w2,
        status.active_agents,
        status.active_jobs,
        status.backend_status,
        source
    )
}

fn coordination_text(result: &CoordinationResult) -> String {
    let head = if result.success {
        result.summary.clone().green().bold()
    } else {
        result.summary.clone().red().bold()
    };
    let mut out = format!("{}\n", head);
    for report in &result.results {
        let mark = if report.success { "ok".green() } else { "failed".red() };
        let _ = write!(
            out,
            "  #{} {:<6} {} on {} ({}ms)",
            report.index, mark, report.task, report.agent_id, report.elapsed_ms
        );
        if let Some(error) = &report.error {
            let _ = write!(out, ": {}", error);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn insights_text(insights: &ActivityInsights) -> String {
    let mut out = format!(
        "Entries          {}\nSuccess rate     {:.1}%\nEfficiency gain  {:.1}%\nNext task        {}\n",
        insights.entries_considered,
        insights.success_rate * 100.0,
        insights.efficiency_gain,
        insights.predicted_next_task
    );
    if insights.patterns.is_empty() {
        out.push_str("Patterns         none");
    } else {
        out.push_str("Patterns");
        for pattern in &insights.patterns {
            let _ = write!(out, "\n  - {}", pattern);
        }
    }
    out
}

fn permission_line(request: &PermissionRequest) -> String {
    let status = request.status.to_string();
    let status = if request.is_pending() {
        status.yellow()
    } else {
        status.stylize()
    };
    format!(
        "{}  {:<9} agent {} {} {}: {}",
        request.id, status, request.agent_id, request.action, request.resource, request.reason
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::{AgentId, ConsciousnessReading, EntityIdType};
    use aura_orchestrator::SubtaskReport;
    use serde_json::json;

    fn coordination(success: bool) -> CoordinationResult {
        CoordinationResult {
            summary: if success { "Completed 1 subtasks" } else { "1 of 1 subtasks failed" }.to_string(),
            success,
            results: vec![SubtaskReport {
                index: 0,
                agent_id: AgentId::now_v7(),
                task: "calibrate".to_string(),
                success,
                result: None,
                error: (!success).then(|| "decoherence".to_string()),
                elapsed_ms: 12,
            }],
        }
    }

    #[test]
    fn test_failed_backend_payload_is_not_success() {
        let report = Report::Dispatch(DispatchOutcome::JobSubmitted {
            response: json!({"success": false, "error": "queue full"}),
        });
        assert!(!report.is_success());
        assert!(report.to_text().contains("queue full"));
    }

    #[test]
    fn test_coordination_failure_lists_errors() {
        let report = Report::Coordination(coordination(false));
        assert!(!report.is_success());
        let text = report.to_text();
        assert!(text.contains("1 of 1 subtasks failed"));
        assert!(text.contains("decoherence"));
    }

    #[test]
    fn test_json_output_is_tagged() {
        let report = Report::Dispatch(DispatchOutcome::Deployed {
            response: json!({"success": true}),
        });
        let parsed: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(parsed["kind"], "deployed");
    }

    #[test]
    fn test_status_text_marks_placeholder_source() {
        let status = SwarmStatus {
            metrics: ConsciousnessReading::placeholder(),
            health: 0.9,
            active_agents: 2,
            active_jobs: 0,
            backend_status: "unknown".to_string(),
            live: false,
        };
        let text = Report::Status(status).to_text();
        assert!(text.contains("placeholder"));
        assert!(text.contains("2 active"));
        assert!(text.contains("good"));
    }

    #[test]
    fn test_empty_lists_have_hints() {
        assert!(Report::Agents(Vec::new()).to_text().contains("--all"));
        assert!(Report::Suggestions(Vec::new()).to_text().contains("No matching"));
    }
}
