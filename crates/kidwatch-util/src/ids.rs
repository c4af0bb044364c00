//! Strongly-typed identifiers for kidwatch

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a monitored child
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChildId(String);

impl ChildId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChildId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChildId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of the parent account that owns a child
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentId(String);

impl ParentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a parent-facing notification record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_id_equality() {
        let id1 = ChildId::new("alex");
        let id2 = ChildId::from("alex");
        let id3 = ChildId::new("sam");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn notification_id_uniqueness() {
        let n1 = NotificationId::new();
        let n2 = NotificationId::new();
        assert_ne!(n1, n2);
    }

    #[test]
    fn child_id_serializes_as_plain_string() {
        let id = ChildId::new("alex");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"alex\"");
    }
}
