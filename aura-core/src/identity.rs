//! Identity types for swarm entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common surface of the strongly-typed identifiers.
pub trait EntityIdType: Copy + Eq + std::hash::Hash + fmt::Display {
    /// Human-readable prefix used in logs and short display.
    const PREFIX: &'static str;

    fn new(uuid: Uuid) -> Self;

    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh timestamp-sortable (UUIDv7) identifier.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// First eight hex characters, for compact terminal output.
    fn short(&self) -> String {
        self.as_uuid().simple().to_string()[..8].to_string()
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            const PREFIX: &'static str = $prefix;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

entity_id!(
    /// Identifier of a swarm agent.
    AgentId,
    "agent"
);
entity_id!(
    /// Identifier of a permission request.
    PermissionRequestId,
    "perm"
);
entity_id!(
    /// Identifier of an activity log entry.
    ActivityId,
    "act"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrips_through_display() {
        let id = AgentId::now_v7();
        let parsed: AgentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_short_is_eight_chars() {
        let id = PermissionRequestId::now_v7();
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_ids_serialize_as_plain_uuid() {
        let uuid = Uuid::now_v7();
        let id = ActivityId::new(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }
}
