use serde::{Deserialize, Serialize};

/// A directed edge between two nodes of a flow.
///
/// Descriptive metadata only: it never gates execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
}

impl Edge {
    /// Create an edge whose id is derived from its endpoints (`e-{source}-{target}`).
    pub fn link(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("e-{}-{}", source, target),
            source,
            target,
        }
    }
}
