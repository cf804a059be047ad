//! Agent records and their lifecycle status.

use crate::{identity::EntityIdType, AgentId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Specialization used when no better-matched agent exists.
pub const GENERAL_SPECIALIZATION: &str = "general";

/// Trust assigned to newly spawned agents.
pub const DEFAULT_TRUST: f64 = 0.8;

// ============================================================================
// AGENT STATUS
// ============================================================================

/// Status of an agent in the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Registered and available for work
    #[default]
    Idle,
    /// Processing a task
    Active,
    Learning,
    Optimizing,
    /// Last task failed
    Error,
}

impl AgentStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Active => "active",
            AgentStatus::Learning => "learning",
            AgentStatus::Optimizing => "optimizing",
            AgentStatus::Error => "error",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, AgentStatusParseError> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(AgentStatus::Idle),
            "active" => Ok(AgentStatus::Active),
            "learning" => Ok(AgentStatus::Learning),
            "optimizing" => Ok(AgentStatus::Optimizing),
            "error" => Ok(AgentStatus::Error),
            _ => Err(AgentStatusParseError(s.to_string())),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, AgentStatus::Idle)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for AgentStatus {
    type Err = AgentStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid agent status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStatusParseError(pub String);

impl fmt::Display for AgentStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid agent status: {}", self.0)
    }
}

impl std::error::Error for AgentStatusParseError {}

// ============================================================================
// OUTCOME
// ============================================================================

/// Outcome of a completed task, as seen by the trust rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

// ============================================================================
// AGENT
// ============================================================================

/// Performance counters, updated once per completed task.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Performance {
    pub tasks_completed: u64,
    /// Successful / completed, within [0, 1].
    pub success_rate: f64,
    /// Running mean in seconds.
    pub avg_execution_time: f64,
}

impl Performance {
    /// Fold one completed task into the counters.
    pub fn record(&mut self, outcome: Outcome, duration_secs: Option<f64>) {
        let old_count = self.tasks_completed as f64;
        let hit = if outcome.is_success() { 1.0 } else { 0.0 };
        self.success_rate = ((self.success_rate * old_count + hit) / (old_count + 1.0)).clamp(0.0, 1.0);
        if let Some(secs) = duration_secs.filter(|s| s.is_finite() && *s >= 0.0) {
            self.avg_execution_time = (self.avg_execution_time * old_count + secs) / (old_count + 1.0);
        }
        self.tasks_completed += 1;
    }
}

/// A swarm agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub specialization: String,
    pub status: AgentStatus,
    /// Always within [0, 1].
    pub trust: f64,
    pub permissions: BTreeSet<String>,
    pub performance: Performance,
    /// Task the agent is working on while `Active`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    pub created_at: Timestamp,
}

impl Agent {
    /// Create an idle agent with zeroed counters and no permissions.
    ///
    /// `name` defaults to `<specialization>-agent-<millis>`.
    pub fn new(name: Option<String>, specialization: impl Into<String>, trust: f64) -> Self {
        let specialization = specialization.into();
        let created_at = Utc::now();
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{}-agent-{}", specialization, created_at.timestamp_millis()));
        Self {
            id: AgentId::now_v7(),
            name,
            specialization,
            status: AgentStatus::Idle,
            trust: clamp_trust(trust),
            permissions: BTreeSet::new(),
            performance: Performance::default(),
            current_task: None,
            created_at,
        }
    }

    pub fn has_permission(&self, action: &str) -> bool {
        self.permissions.contains(action)
    }

    /// Selection score: trust doubled while idle.
    pub fn selection_score(&self) -> f64 {
        let availability = if self.status.is_idle() { 2.0 } else { 1.0 };
        self.trust * availability
    }

    /// Mark active on `task`.
    pub fn begin_task(&mut self, task: impl Into<String>) {
        self.status = AgentStatus::Active;
        self.current_task = Some(task.into());
    }

    /// Leave `Active`, ending `Idle` on success and `Error` otherwise.
    pub fn finish_task(&mut self, outcome: Outcome) {
        self.status = if outcome.is_success() {
            AgentStatus::Idle
        } else {
            AgentStatus::Error
        };
        self.current_task = None;
    }
}

/// Clamp to [0, 1], mapping NaN to 0.
pub fn clamp_trust(trust: f64) -> f64 {
    if trust.is_nan() {
        0.0
    } else {
        trust.clamp(0.0, 1.0)
    }
}
