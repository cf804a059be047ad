//! Append-only activity audit trail.

use crate::{identity::EntityIdType, ActivityId, AgentId, Outcome, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Impact recorded when no better estimate is available.
pub const DEFAULT_IMPACT: f64 = 5.0;

/// Impact recorded for an approved permission request.
pub const APPROVAL_IMPACT: f64 = 8.0;

/// Impact recorded for a denied permission request.
pub const DENIAL_IMPACT: f64 = 3.0;

/// Result recorded on an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityResult {
    Success,
    Failure,
    Pending,
}

impl ActivityResult {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ActivityResult::Success => "success",
            ActivityResult::Failure => "failure",
            ActivityResult::Pending => "pending",
        }
    }
}

impl fmt::Display for ActivityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl From<Outcome> for ActivityResult {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ActivityResult::Success,
            Outcome::Failure => ActivityResult::Failure,
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: ActivityId,
    pub timestamp: Timestamp,
    pub agent_id: AgentId,
    pub action: String,
    pub result: ActivityResult,
    pub details: String,
    pub impact_score: f64,
}

impl ActivityLogEntry {
    pub fn new(
        agent_id: AgentId,
        action: impl Into<String>,
        result: ActivityResult,
        details: impl Into<String>,
        impact_score: f64,
    ) -> Self {
        Self {
            id: ActivityId::now_v7(),
            timestamp: Utc::now(),
            agent_id,
            action: action.into(),
            result,
            details: details.into(),
            impact_score,
        }
    }
}
