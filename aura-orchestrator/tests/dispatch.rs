//! Dispatch of classified intents against a scripted backend.

use aura_agents::AgentRegistry;
use aura_core::{Action, AgentStatus, AuraError, DispatchError, EntityIdType};
use aura_nlp::IntentClassifier;
use aura_orchestrator::{
    DispatchOutcome, ExecutionBackend, Orchestrator, DEFAULT_BACKEND, DEFAULT_SHOTS, STATUS_PATH,
};
use aura_storage::MemoryStore;
use aura_test_utils::assertions::{assert_dispatch_error, assert_trust_in_bounds};
use aura_test_utils::{intent, status_payload, Entities, ScriptedBackend, ScriptedRemoteClassifier};
use serde_json::json;
use std::sync::Arc;

fn orchestrator(backend: ScriptedBackend) -> (Orchestrator, Arc<ScriptedBackend>) {
    let backend = Arc::new(backend);
    let registry = Arc::new(AgentRegistry::new(Arc::new(MemoryStore::new())));
    let dyn_backend: Arc<dyn ExecutionBackend> = backend.clone();
    (Orchestrator::new(dyn_backend, registry), backend)
}

fn temp_artifact(contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("organism-{}.dna", aura_core::AgentId::now_v7()));
    std::fs::write(&path, contents).unwrap();
    path
}

// ============================================================================
// DEPLOY
// ============================================================================

#[tokio::test]
async fn test_deploy_reads_artifact_and_applies_defaults() {
    let (orch, backend) = orchestrator(
        ScriptedBackend::new().respond("/api/organisms/deploy", json!({"organism_id": "org-1"})),
    );
    let path = temp_artifact("ORGANISM alpha { }");
    let deploy = intent(
        Action::DeployOrganism,
        &[("file", json!(path.to_string_lossy()))],
        "deploy organism",
    );

    let outcome = orch.execute(&deploy).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Deployed { ref response } if response["organism_id"] == "org-1"));

    let calls = backend.calls_to("/api/organisms/deploy");
    assert_eq!(calls.len(), 1);
    let body = calls[0].body.clone().unwrap();
    assert_eq!(body["dna_code"], "ORGANISM alpha { }");
    assert_eq!(body["backend"], DEFAULT_BACKEND);
    assert_eq!(body["shots"], DEFAULT_SHOTS);
    std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn test_deploy_without_file_entity_is_missing_entity() {
    let (orch, backend) = orchestrator(ScriptedBackend::new());
    let result = orch
        .execute(&intent(Action::DeployOrganism, &[], "deploy it"))
        .await;
    assert!(matches!(
        result,
        Err(AuraError::Dispatch(DispatchError::MissingEntity { ref entity, .. })) if entity == "file"
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_deploy_unreadable_artifact() {
    let (orch, _) = orchestrator(ScriptedBackend::new());
    let result = orch
        .execute(&intent(
            Action::DeployOrganism,
            &[("file", json!("/nonexistent/organism.dna"))],
            "deploy organism.dna",
        ))
        .await;
    assert!(matches!(
        result,
        Err(AuraError::Dispatch(DispatchError::ArtifactUnreadable { .. }))
    ));
}

// ============================================================================
// AGENTS
// ============================================================================

#[tokio::test]
async fn test_spawn_agent_uses_entities() {
    let (orch, _) = orchestrator(ScriptedBackend::new());
    let outcome = orch
        .execute(&intent(
            Action::SpawnAgent,
            &[("specialization", json!("quantum"))],
            "spawn quantum agent",
        ))
        .await
        .unwrap();
    let DispatchOutcome::AgentSpawned { agent } = outcome else {
        panic!("expected spawned agent, got {:?}", outcome);
    };
    assert_eq!(agent.specialization, "quantum");
    assert!(agent.name.starts_with("Agent-"));
    assert!(orch.registry().contains(agent.id).await);
}

#[tokio::test]
async fn test_list_agents_hides_idle_unless_all_requested() {
    let (orch, _) = orchestrator(ScriptedBackend::new());
    orch.registry().spawn(None, "quantum", 0.8).await.unwrap();
    orch.registry().spawn(None, "code", 0.8).await.unwrap();

    let busy = orch
        .execute(&intent(Action::ListAgents, &[], "list agents"))
        .await
        .unwrap();
    assert!(matches!(busy, DispatchOutcome::AgentList { ref agents } if agents.is_empty()));

    let all = orch
        .execute(&intent(Action::ListAgents, &[], "list all agents"))
        .await
        .unwrap();
    assert!(matches!(all, DispatchOutcome::AgentList { ref agents } if agents.len() == 2));
}

// ============================================================================
// AGENT-ROUTED ACTIONS
// ============================================================================

#[tokio::test]
async fn test_optimize_routes_to_quantum_agent_and_updates_trust() {
    let (orch, backend) = orchestrator(ScriptedBackend::new().respond(
        "/api/quantum/optimize",
        json!({"success": true, "impact_score": 10.0, "gamma": 0.003}),
    ));
    let outcome = orch
        .execute(&intent(
            Action::OptimizeCircuit,
            &[("backend", json!("ibm_torino"))],
            "optimize circuit on ibm_torino",
        ))
        .await
        .unwrap();

    let DispatchOutcome::CircuitOptimized { agent, permission_request, .. } = outcome else {
        panic!("expected optimization outcome");
    };
    assert_eq!(agent.specialization, "quantum");
    assert_eq!(agent.status, AgentStatus::Idle);
    assert_eq!(agent.performance.tasks_completed, 1);
    assert!((agent.trust - 0.82).abs() < 1e-9);
    assert_trust_in_bounds(&agent);
    assert!(permission_request.is_none());

    let body = backend.calls_to("/api/quantum/optimize")[0].body.clone().unwrap();
    assert_eq!(body["agent_id"], agent.id.to_string());
    assert_eq!(body["backend"], "ibm_torino");
    assert_eq!(body["optimization_goal"], "minimize_gamma");
}

#[tokio::test]
async fn test_repeated_optimization_opens_permission_request() {
    let (orch, _) = orchestrator(
        ScriptedBackend::new().respond("/api/quantum/optimize", json!({"success": true})),
    );
    let optimize = intent(Action::OptimizeCircuit, &[], "optimize circuit");

    for _ in 0..2 {
        let outcome = orch.execute(&optimize).await.unwrap();
        assert!(matches!(
            outcome,
            DispatchOutcome::CircuitOptimized { permission_request: None, .. }
        ));
    }
    let third = orch.execute(&optimize).await.unwrap();
    let DispatchOutcome::CircuitOptimized { agent, permission_request: Some(request), .. } = third else {
        panic!("expected a permission request on the third run");
    };
    assert_eq!(request.agent_id, agent.id);
    assert_eq!(request.action, "optimize_circuit");
    assert!(request.reason.starts_with("Detected pattern:"));
    assert_eq!(orch.permissions().pending().await.len(), 1);

    // No duplicate while the first is pending
    let fourth = orch.execute(&optimize).await.unwrap();
    assert!(matches!(
        fourth,
        DispatchOutcome::CircuitOptimized { permission_request: None, .. }
    ));
}

#[tokio::test]
async fn test_failed_generation_leaves_agent_in_error() {
    let (orch, _) = orchestrator(ScriptedBackend::new().fail("/api/swarm/generate-code", "model offline"));
    let result = orch
        .execute(&intent(
            Action::GenerateCode,
            &[("text", json!("a bell state circuit"))],
            "generate code for \"a bell state circuit\"",
        ))
        .await;
    assert_dispatch_error(&result);

    let agents = orch.registry().list(true).await;
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].specialization, "code");
    assert_eq!(agents[0].status, AgentStatus::Error);
    assert!(agents[0].trust < 0.8);
    assert!(agents[0].current_task.is_none());
}

// ============================================================================
// JOBS, STATUS, MUTATIONS, PASS-THROUGH
// ============================================================================

#[tokio::test]
async fn test_quantum_job_uses_entity_shots() {
    let (orch, backend) =
        orchestrator(ScriptedBackend::new().respond("/api/quantum/jobs", json!({"job_id": "job-7"})));
    orch.execute(&intent(
        Action::RunQuantumJob,
        &[("shot", json!(4096)), ("backend", json!("ibm_kyoto"))],
        "run quantum job with 4096 shots on ibm_kyoto",
    ))
    .await
    .unwrap();
    let body = backend.calls_to("/api/quantum/jobs")[0].body.clone().unwrap();
    assert_eq!(body["shots"], 4096);
    assert_eq!(body["backend"], "ibm_kyoto");
}

#[tokio::test]
async fn test_status_falls_back_to_placeholders() {
    let (orch, _) = orchestrator(ScriptedBackend::new().fail(STATUS_PATH, "unreachable"));
    let outcome = orch
        .execute(&intent(Action::GetStatus, &[], "status"))
        .await
        .unwrap();
    let DispatchOutcome::Status { status } = outcome else {
        panic!("expected status");
    };
    assert!(!status.live);
    assert_eq!(status.metrics.phi, aura_core::PLACEHOLDER_PHI);
    assert_eq!(status.backend_status, "unknown");
}

#[tokio::test]
async fn test_status_reports_live_metrics() {
    let (orch, _) = orchestrator(ScriptedBackend::new().respond(STATUS_PATH, status_payload(0.9, 0.02, 0.05)));
    let outcome = orch
        .execute(&intent(Action::GetStatus, &[], "status"))
        .await
        .unwrap();
    let DispatchOutcome::Status { status } = outcome else {
        panic!("expected status");
    };
    assert!(status.live);
    assert_eq!(status.active_jobs, 2);
    assert!((status.health - 0.8567).abs() < 1e-3);
}

#[tokio::test]
async fn test_commit_mutation_defaults() {
    let (orch, backend) = orchestrator(
        ScriptedBackend::new().respond("/api/swarm/commit-mutation", json!({"commit": "abc123"})),
    );
    orch.execute(&intent(Action::CommitMutation, &[("text", json!("let x = 1;"))], "commit mutation"))
        .await
        .unwrap();
    let body = backend.calls_to("/api/swarm/commit-mutation")[0].body.clone().unwrap();
    assert_eq!(body["code"], "let x = 1;");
    assert_eq!(body["filename"], "generated.tsx");
    assert_eq!(body["commit_message"], "Mutation via AURA Swarm CLI");
}

#[tokio::test]
async fn test_unknown_action_passes_through() {
    let (orch, backend) =
        orchestrator(ScriptedBackend::new().respond("/api/nlp2/execute", json!({"handled": true})));
    let outcome = orch
        .execute(&intent(Action::Other("teleport".to_string()), &[], "teleport the qubits"))
        .await
        .unwrap();
    assert!(matches!(outcome, DispatchOutcome::PassedThrough { ref action, .. } if action.as_label() == "teleport"));

    let body = backend.calls_to("/api/nlp2/execute")[0].body.clone().unwrap();
    assert_eq!(body["command"], "teleport the qubits");
    assert_eq!(body["intent"]["action"], "teleport");
}

// ============================================================================
// CLASSIFY THEN DISPATCH
// ============================================================================

#[tokio::test]
async fn test_remote_fallback_intent_dispatches() {
    let remote = Arc::new(ScriptedRemoteClassifier::answering("get_status", 0.95, Entities::new()));
    let classifier = IntentClassifier::new().with_remote(remote.clone());
    let (orch, _) = orchestrator(ScriptedBackend::new().respond(STATUS_PATH, status_payload(0.8, 0.01, 0.1)));

    let parsed = classifier.classify("zorp blig quux").await.unwrap();
    assert_eq!(parsed.action, Action::GetStatus);
    assert_eq!(remote.calls(), vec!["zorp blig quux".to_string()]);

    let outcome = orch.execute(&parsed).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Status { .. }));
}
