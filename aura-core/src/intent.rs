//! Classified command intents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// ACTION
// ============================================================================

/// Symbolic action a command resolves to.
///
/// The known variants form the dispatch table. Anything else is kept as
/// `Other` and forwarded verbatim to the generic execution endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    DeployOrganism,
    SpawnAgent,
    ListAgents,
    OptimizeCircuit,
    RunQuantumJob,
    GenerateCode,
    GetStatus,
    CommitMutation,
    Other(String),
}

impl Action {
    /// All actions with a dedicated dispatch branch, in label order.
    pub const KNOWN: [Action; 8] = [
        Action::DeployOrganism,
        Action::SpawnAgent,
        Action::ListAgents,
        Action::OptimizeCircuit,
        Action::RunQuantumJob,
        Action::GenerateCode,
        Action::GetStatus,
        Action::CommitMutation,
    ];

    pub fn as_label(&self) -> &str {
        match self {
            Action::DeployOrganism => "deploy_organism",
            Action::SpawnAgent => "spawn_agent",
            Action::ListAgents => "list_agents",
            Action::OptimizeCircuit => "optimize_circuit",
            Action::RunQuantumJob => "run_quantum_job",
            Action::GenerateCode => "generate_code",
            Action::GetStatus => "get_status",
            Action::CommitMutation => "commit_mutation",
            Action::Other(label) => label,
        }
    }

    /// Total: unknown labels become `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "deploy_organism" => Action::DeployOrganism,
            "spawn_agent" => Action::SpawnAgent,
            "list_agents" => Action::ListAgents,
            "optimize_circuit" => Action::OptimizeCircuit,
            "run_quantum_job" => Action::RunQuantumJob,
            "generate_code" => Action::GenerateCode,
            "get_status" => Action::GetStatus,
            "commit_mutation" => Action::CommitMutation,
            _ => Action::Other(label.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Action::Other(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

impl Serialize for Action {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_label())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Action::from_label(&label))
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// Structured fields pulled out of command text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entities(BTreeMap<String, Value>);

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`, if present and a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Integer value of `key`, accepting numeric strings as well.
    pub fn number(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert only if `key` is absent, so the first match wins.
    pub fn insert_first(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Overwrite `key` unconditionally.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn merge(&mut self, other: Entities) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for Entities {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

// ============================================================================
// COMMAND INTENT
// ============================================================================

/// A classified, structured representation of a free-text command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandIntent {
    pub action: Action,
    pub entities: Entities,
    /// Always within [0, 1].
    pub confidence: f64,
    pub raw_command: String,
}

impl CommandIntent {
    pub fn new(
        action: Action,
        entities: Entities,
        confidence: f64,
        raw_command: impl Into<String>,
    ) -> Self {
        Self {
            action,
            entities,
            confidence: confidence.clamp(0.0, 1.0),
            raw_command: raw_command.into(),
        }
    }
}
