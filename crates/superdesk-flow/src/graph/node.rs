use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a node represents in the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum NodeKind {
    /// A diagnostic or remediation step.
    #[default]
    Task,
}

/// A step in a troubleshooting flow.
///
/// The id is the node's identity within its flow; the label is the
/// human-authored step text and drives capability routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the flow.
    pub id: String,
    /// Human-readable step description.
    pub label: String,
    #[serde(default)]
    pub kind: NodeKind,
}

impl Node {
    /// Create a task node with an explicit id.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: NodeKind::Task,
        }
    }

    /// Create a task node with a freshly generated id.
    pub fn task(label: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), label)
    }

    /// Set the kind.
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }
}
