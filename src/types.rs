//! Core identifiers and small shared value types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one expert group, e.g. `"group_1"`.
///
/// Unlike the teacher's UUID-backed `AgentId`, a group id is a caller-assigned
/// configuration key: it must remain the same string across every round so
/// that citation keys (`group_id.index`) stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque run identifier, used only for tracing correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_id_display_roundtrips_string() {
        let g = GroupId::from("group_1");
        assert_eq!(g.to_string(), "group_1");
        assert_eq!(g.as_str(), "group_1");
    }

    #[test]
    fn group_id_ordering_is_lexicographic() {
        let mut ids = vec![GroupId::from("group_2"), GroupId::from("group_1")];
        ids.sort();
        assert_eq!(ids, vec![GroupId::from("group_1"), GroupId::from("group_2")]);
    }
}
