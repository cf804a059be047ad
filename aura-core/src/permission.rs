//! Permission requests and operator decisions.

use crate::{identity::EntityIdType, AgentId, PermissionRequestId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a permission request. `Approved` and `Denied` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    #[default]
    Pending,
    Approved,
    Denied,
}

impl PermissionStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PermissionStatus::Pending => "pending",
            PermissionStatus::Approved => "approved",
            PermissionStatus::Denied => "denied",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, PermissionStatusParseError> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PermissionStatus::Pending),
            "approved" => Ok(PermissionStatus::Approved),
            "denied" => Ok(PermissionStatus::Denied),
            _ => Err(PermissionStatusParseError(s.to_string())),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PermissionStatus::Pending)
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for PermissionStatus {
    type Err = PermissionStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid permission status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionStatusParseError(pub String);

impl fmt::Display for PermissionStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid permission status: {}", self.0)
    }
}

impl std::error::Error for PermissionStatusParseError {}

/// Operator decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    pub fn resulting_status(&self) -> PermissionStatus {
        match self {
            Decision::Approve => PermissionStatus::Approved,
            Decision::Deny => PermissionStatus::Denied,
        }
    }
}

impl FromStr for Decision {
    type Err = PermissionStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "approve" | "approved" | "yes" => Ok(Decision::Approve),
            "deny" | "denied" | "no" => Ok(Decision::Deny),
            _ => Err(PermissionStatusParseError(s.to_string())),
        }
    }
}

/// An agent's request for a capability outside its permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub id: PermissionRequestId,
    pub agent_id: AgentId,
    pub action: String,
    pub resource: String,
    pub reason: String,
    pub status: PermissionStatus,
    pub timestamp: Timestamp,
}

impl PermissionRequest {
    /// Create a pending request.
    pub fn new(
        agent_id: AgentId,
        action: impl Into<String>,
        resource: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: PermissionRequestId::now_v7(),
            agent_id,
            action: action.into(),
            resource: resource.into(),
            reason: reason.into(),
            status: PermissionStatus::Pending,
            timestamp: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PermissionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_pending() {
        let req = PermissionRequest::new(AgentId::now_v7(), "deploy", "ibm_fez", "needs hardware");
        assert!(req.is_pending());
        assert!(!req.status.is_terminal());
    }

    #[test]
    fn test_decision_maps_to_terminal_status() {
        assert_eq!(Decision::Approve.resulting_status(), PermissionStatus::Approved);
        assert_eq!(Decision::Deny.resulting_status(), PermissionStatus::Denied);
        assert!(Decision::Approve.resulting_status().is_terminal());
    }

    #[test]
    fn test_decision_parses_aliases() {
        assert_eq!("APPROVE".parse::<Decision>(), Ok(Decision::Approve));
        assert_eq!("no".parse::<Decision>(), Ok(Decision::Deny));
        assert!("maybe".parse::<Decision>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&PermissionStatus::Denied).unwrap();
        assert_eq!(json, "\"denied\"");
    }
}
