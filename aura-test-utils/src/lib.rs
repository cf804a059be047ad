//! AURA Test Utilities
//!
//! Shared test infrastructure for the AURA workspace:
//! - Proptest generators for agents, trust scores and readings
//! - Fixtures for common agent and payload shapes
//! - Scripted collaborators standing in for the remote services
//! - Custom assertions

// Re-export the in-memory store from its source crate
pub use aura_storage::MemoryStore;

// Re-export core types for convenience
pub use aura_core::{
    Action, Agent, AgentId, AgentStatus, AuraError, AuraResult, CommandIntent,
    ConsciousnessReading, DispatchError, Entities, EntityIdType, FeedError, Outcome,
    PartialReading, DEFAULT_TRUST,
};

pub use fixtures::*;
pub use generators::*;
pub use mocks::*;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use aura_core::Performance;
    use proptest::prelude::*;

    /// Trust scores, including both bounds.
    pub fn arb_trust() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.0), Just(1.0), 0.0f64..=1.0]
    }

    pub fn arb_agent_status() -> impl Strategy<Value = AgentStatus> {
        prop_oneof![
            Just(AgentStatus::Idle),
            Just(AgentStatus::Active),
            Just(AgentStatus::Learning),
            Just(AgentStatus::Optimizing),
            Just(AgentStatus::Error),
        ]
    }

    pub fn arb_outcome() -> impl Strategy<Value = Outcome> {
        prop_oneof![Just(Outcome::Success), Just(Outcome::Failure)]
    }

    /// Mostly the known specializations, sometimes arbitrary tags.
    pub fn arb_specialization() -> impl Strategy<Value = String> {
        prop_oneof![
            4 => prop::sample::select(vec!["quantum", "code", "general", "data", "optimization"])
                .prop_map(str::to_string),
            1 => "[a-z]{1,12}",
        ]
    }

    pub fn arb_agent() -> impl Strategy<Value = Agent> {
        (
            "[A-Za-z][A-Za-z0-9-]{0,15}",
            arb_specialization(),
            arb_agent_status(),
            arb_trust(),
            0u64..500,
            0.0f64..=1.0,
        )
            .prop_map(|(name, specialization, status, trust, tasks, success_rate)| {
                let mut agent = Agent::new(Some(name), specialization, trust);
                agent.status = status;
                agent.performance = Performance {
                    tasks_completed: tasks,
                    success_rate: if tasks == 0 { 0.0 } else { success_rate },
                    avg_execution_time: 0.0,
                };
                agent
            })
    }

    /// Readings with channels in plausible ranges.
    pub fn arb_reading() -> impl Strategy<Value = ConsciousnessReading> {
        (0.0f64..=1.0, 0.0f64..1e-6, 0.0f64..0.5, 0.0f64..1.0)
            .prop_map(|(phi, lambda, gamma, w2)| ConsciousnessReading::new(phi, lambda, gamma, w2))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use serde_json::{json, Value};

    /// Agent with the given specialization, trust and status.
    pub fn agent_with(specialization: &str, trust: f64, status: AgentStatus) -> Agent {
        let mut agent = Agent::new(None, specialization, trust);
        agent.status = status;
        if status == AgentStatus::Active {
            agent.current_task = Some("fixture task".to_string());
        }
        agent
    }

    pub fn idle_agent(specialization: &str) -> Agent {
        agent_with(specialization, DEFAULT_TRUST, AgentStatus::Idle)
    }

    /// Intent as the classifier would produce it.
    pub fn intent(action: Action, entities: &[(&str, Value)], raw_command: &str) -> CommandIntent {
        let mut map = Entities::new();
        for (key, value) in entities {
            map.set(*key, value.clone());
        }
        CommandIntent::new(action, map, 0.9, raw_command)
    }

    /// Status endpoint payload with every channel present.
    pub fn status_payload(phi: f64, gamma: f64, w2: f64) -> Value {
        json!({
            "phi": phi,
            "lambda": 2.0e-8,
            "gamma": gamma,
            "w2": w2,
            "active_jobs": 2,
            "backend": "ibm_fez",
        })
    }
}

// ============================================================================
// SCRIPTED COLLABORATORS
// ============================================================================

pub mod mocks {
    use super::*;
    use async_trait::async_trait;
    use aura_core::ClassifierError;
    use aura_monitor::PushChannel;
    use aura_nlp::{RemoteClassifier, RemoteIntent};
    use aura_orchestrator::ExecutionBackend;
    use serde_json::Value;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// One call seen by a [`ScriptedBackend`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedCall {
        pub method: &'static str,
        pub path: String,
        pub body: Option<Value>,
    }

    #[derive(Default)]
    struct Script {
        queued: HashMap<String, VecDeque<Result<Value, DispatchError>>>,
        fixed: HashMap<String, Result<Value, DispatchError>>,
        delays: HashMap<String, Duration>,
        calls: Vec<RecordedCall>,
    }

    /// Execution backend answering from a per-path script.
    ///
    /// Queued responses are used first, then the fixed response for the
    /// path. An unscripted path fails with `DispatchError::Backend`.
    #[derive(Default)]
    pub struct ScriptedBackend {
        script: Mutex<Script>,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer every call to `path` with `response`.
        pub fn respond(self, path: &str, response: Value) -> Self {
            self.lock().fixed.insert(path.to_string(), Ok(response));
            self
        }

        /// Fail every call to `path`.
        pub fn fail(self, path: &str, reason: &str) -> Self {
            let err = DispatchError::Backend {
                endpoint: path.to_string(),
                reason: reason.to_string(),
            };
            self.lock().fixed.insert(path.to_string(), Err(err));
            self
        }

        /// Answer the next call to `path` with `response`, ahead of the fixed one.
        pub fn enqueue(self, path: &str, response: Result<Value, DispatchError>) -> Self {
            self.lock()
                .queued
                .entry(path.to_string())
                .or_default()
                .push_back(response);
            self
        }

        /// Sleep before answering calls to `path`.
        pub fn delay(self, path: &str, delay: Duration) -> Self {
            self.lock().delays.insert(path.to_string(), delay);
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.lock().calls.clone()
        }

        pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
            self.calls().into_iter().filter(|c| c.path == path).collect()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
            self.script.lock().expect("scripted backend lock poisoned")
        }

        async fn answer(&self, method: &'static str, path: &str, body: Option<Value>) -> Result<Value, DispatchError> {
            let delay = {
                let mut script = self.lock();
                script.calls.push(RecordedCall {
                    method,
                    path: path.to_string(),
                    body,
                });
                script.delays.get(path).copied()
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut script = self.lock();
            if let Some(response) = script.queued.get_mut(path).and_then(VecDeque::pop_front) {
                return response;
            }
            script.fixed.get(path).cloned().unwrap_or_else(|| {
                Err(DispatchError::Backend {
                    endpoint: path.to_string(),
                    reason: "no scripted response".to_string(),
                })
            })
        }
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        async fn get(&self, path: &str) -> Result<Value, DispatchError> {
            self.answer("GET", path, None).await
        }

        async fn post(&self, path: &str, body: Value) -> Result<Value, DispatchError> {
            self.answer("POST", path, Some(body)).await
        }
    }

    /// Remote classifier returning a fixed answer (or error), counting calls.
    pub struct ScriptedRemoteClassifier {
        answer: Result<RemoteIntent, ClassifierError>,
        delay: Option<Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRemoteClassifier {
        pub fn answering(action: &str, confidence: f64, entities: Entities) -> Self {
            Self {
                answer: Ok(RemoteIntent {
                    action: action.to_string(),
                    confidence,
                    entities,
                }),
                delay: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(err: ClassifierError) -> Self {
            Self {
                answer: Err(err),
                delay: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Commands seen so far.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("classifier lock poisoned").clone()
        }
    }

    #[async_trait]
    impl RemoteClassifier for ScriptedRemoteClassifier {
        async fn classify(&self, command: &str) -> Result<RemoteIntent, ClassifierError> {
            self.calls
                .lock()
                .expect("classifier lock poisoned")
                .push(command.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answer.clone()
        }
    }

    /// Push channel fed through an mpsc sender. Dropping the sender closes
    /// the channel.
    pub struct ChannelPush {
        rx: mpsc::UnboundedReceiver<Result<PartialReading, FeedError>>,
        refuse: bool,
    }

    impl ChannelPush {
        pub fn pair() -> (Self, mpsc::UnboundedSender<Result<PartialReading, FeedError>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { rx, refuse: false }, tx)
        }

        /// A channel whose `connect` always fails.
        pub fn refusing() -> Self {
            let (_, rx) = mpsc::unbounded_channel();
            Self { rx, refuse: true }
        }
    }

    #[async_trait]
    impl PushChannel for ChannelPush {
        async fn connect(&mut self) -> Result<(), FeedError> {
            if self.refuse {
                return Err(FeedError::Connect {
                    endpoint: "channel://test".to_string(),
                    reason: "refused".to_string(),
                });
            }
            Ok(())
        }

        async fn next_reading(&mut self) -> Option<Result<PartialReading, FeedError>> {
            self.rx.recv().await
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    use super::*;

    /// Assert that an AuraResult is a Dispatch error.
    #[track_caller]
    pub fn assert_dispatch_error<T: std::fmt::Debug>(result: &AuraResult<T>) {
        match result {
            Err(AuraError::Dispatch(_)) => {}
            other => panic!("Expected Dispatch error, got: {:?}", other),
        }
    }

    /// Assert that an AuraResult is a Permission error.
    #[track_caller]
    pub fn assert_permission_error<T: std::fmt::Debug>(result: &AuraResult<T>) {
        match result {
            Err(AuraError::Permission(_)) => {}
            other => panic!("Expected Permission error, got: {:?}", other),
        }
    }

    /// Assert that an agent's trust is within [0, 1].
    #[track_caller]
    pub fn assert_trust_in_bounds(agent: &Agent) {
        assert!(
            (0.0..=1.0).contains(&agent.trust),
            "Trust {} out of bounds for agent {}",
            agent.trust,
            agent.id
        );
    }

    /// Assert that an agent has left `Active` and dropped its task pointer.
    #[track_caller]
    pub fn assert_not_stuck(agent: &Agent) {
        assert_ne!(agent.status, AgentStatus::Active, "Agent {} still active", agent.id);
        assert!(
            agent.current_task.is_none(),
            "Agent {} still holds task {:?}",
            agent.id,
            agent.current_task
        );
    }
}
