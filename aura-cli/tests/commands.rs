//! One-shot commands against scripted collaborators.

use aura_agents::AgentRegistry;
use aura_cli::{App, CliError, Command, PermissionsCommand, Report};
use aura_core::{AgentError, AgentId, AuraError, EntityIdType};
use aura_nlp::IntentClassifier;
use aura_orchestrator::{DispatchOutcome, ExecutionBackend, Orchestrator};
use aura_storage::SwarmStore;
use aura_test_utils::{Entities, MemoryStore, ScriptedBackend, ScriptedRemoteClassifier};
use serde_json::json;
use std::sync::Arc;

fn app_with(backend: ScriptedBackend, remote_action: &str) -> (App, Arc<AgentRegistry>, Arc<ScriptedBackend>) {
    let registry = Arc::new(AgentRegistry::new(Arc::new(MemoryStore::new())));
    let backend = Arc::new(backend);
    let dyn_backend: Arc<dyn ExecutionBackend> = backend.clone();
    let orchestrator = Orchestrator::new(dyn_backend, registry.clone());
    let remote = Arc::new(ScriptedRemoteClassifier::answering(remote_action, 0.95, Entities::new()));
    let classifier = IntentClassifier::new().with_remote(remote);
    (App::from_parts(orchestrator, classifier), registry, backend)
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[tokio::test]
async fn test_exec_dispatches_remote_intent() {
    let (app, registry, _) = app_with(ScriptedBackend::new(), "list_agents");
    let busy = registry.spawn(None, "quantum", 0.8).await.unwrap();
    registry.begin_task(busy.id, "calibrate").await.unwrap();
    registry.spawn(None, "code", 0.8).await.unwrap();

    let report = app
        .run(Command::Exec { words: words("zorp blig quux") })
        .await
        .unwrap();

    assert!(report.is_success());
    match report {
        Report::Dispatch(DispatchOutcome::AgentList { agents }) => {
            assert_eq!(agents.len(), 1);
            assert_eq!(agents[0].id, busy.id);
        }
        other => panic!("unexpected report {:?}", other),
    }
}

#[tokio::test]
async fn test_exec_reports_backend_failure() {
    let backend = ScriptedBackend::new().respond(
        "/api/quantum/jobs",
        json!({"success": false, "error": "queue full"}),
    );
    let (app, _, backend) = app_with(backend, "run_quantum_job");

    let report = app
        .run(Command::Exec { words: words("zorp blig quux") })
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(backend.calls_to("/api/quantum/jobs").len(), 1);
}

#[tokio::test]
async fn test_agents_listing_respects_all_flag() {
    let (app, registry, _) = app_with(ScriptedBackend::new(), "list_agents");
    registry.spawn(Some("Idle".to_string()), "code", 0.8).await.unwrap();

    let report = app.run(Command::Agents { all: false }).await.unwrap();
    assert!(matches!(report, Report::Agents(ref agents) if agents.is_empty()));

    let (app, registry, _) = app_with(ScriptedBackend::new(), "list_agents");
    registry.spawn(Some("Idle".to_string()), "code", 0.8).await.unwrap();
    let report = app.run(Command::Agents { all: true }).await.unwrap();
    assert!(matches!(report, Report::Agents(ref agents) if agents.len() == 1));
}

#[tokio::test]
async fn test_coordinate_split_runs_each_subtask() {
    let (app, registry, backend) = app_with(ScriptedBackend::new(), "list_agents");
    let agent = registry.spawn(None, "general", 0.8).await.unwrap();
    let path = format!("/api/swarm/agents/{}/execute", agent.id);

    let report = app
        .run(Command::Coordinate {
            goal: "calibrate; transpile".to_string(),
            agents: vec![agent.id],
            split: true,
        })
        .await
        .unwrap();

    // Nothing scripted for the agent path, so both subtasks fail
    assert!(!report.is_success());
    assert_eq!(backend.calls_to(&path).len(), 2);
    match report {
        Report::Coordination(result) => assert_eq!(result.results.len(), 2),
        other => panic!("unexpected report {:?}", other),
    }
}

#[tokio::test]
async fn test_status_falls_back_when_backend_is_down() {
    let (app, _, _) = app_with(ScriptedBackend::new(), "get_status");
    let report = app.run(Command::Status).await.unwrap();
    assert!(report.is_success());
    match report {
        Report::Status(status) => assert!(!status.live),
        other => panic!("unexpected report {:?}", other),
    }
}

#[tokio::test]
async fn test_permission_request_for_unknown_agent_fails() {
    let (app, _, _) = app_with(ScriptedBackend::new(), "list_agents");
    let result = app
        .run(Command::Permissions {
            command: PermissionsCommand::Request {
                agent: AgentId::now_v7(),
                action: "deploy_organism".to_string(),
                resource: String::new(),
                reason: "operator".to_string(),
            },
        })
        .await;
    assert!(matches!(
        result,
        Err(CliError::Aura(AuraError::Agent(AgentError::NotRegistered { .. })))
    ));
}

#[tokio::test]
async fn test_monitor_is_not_a_one_shot_command() {
    let (app, _, _) = app_with(ScriptedBackend::new(), "list_agents");
    assert!(matches!(app.run(Command::Monitor).await, Err(CliError::Failed(_))));
}

#[tokio::test]
async fn test_spawned_agent_reaches_store_before_exit() {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(AgentRegistry::new(store.clone()));
    let orchestrator = Orchestrator::new(Arc::new(ScriptedBackend::new()), registry);
    let app = App::from_parts(orchestrator, IntentClassifier::new());

    let report = app
        .run(Command::Spawn {
            specialization: "quantum".to_string(),
            name: Some("qubit-whisperer".to_string()),
            trust: 0.8,
        })
        .await
        .unwrap();

    let Report::Agent(agent) = report else {
        panic!("expected a spawned agent");
    };
    assert_eq!(store.agent_count(), 1);
    assert!(store.agent_get(agent.id).await.unwrap().is_some());
}
