use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique run identifier. Caller-supplied or generated.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
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

/// The fixed set of capabilities a node can be routed to.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityId {
    /// Knowledge-base search.
    #[serde(rename = "kb_search")]
    KnowledgeBase,
    /// News fetch.
    #[serde(rename = "news_fetch")]
    News,
    /// LLM reasoning.
    #[serde(rename = "llm_reasoning")]
    Reasoning,
    /// Hardware diagnostic (long-running).
    HardwareDiagnostic,
}

impl CapabilityId {
    pub const ALL: [CapabilityId; 4] = [
        CapabilityId::KnowledgeBase,
        CapabilityId::News,
        CapabilityId::Reasoning,
        CapabilityId::HardwareDiagnostic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeBase => "kb_search",
            Self::News => "news_fetch",
            Self::Reasoning => "llm_reasoning",
            Self::HardwareDiagnostic => "hardware_diagnostic",
        }
    }
}

impl std::fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single node within a run.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Running,
    Done,
    Error,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        })
    }
}

/// Descriptive metadata attached to a generated flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMeta {
    /// The issue text, verbatim.
    pub issue: String,
    /// Which template produced the flow (e.g. "bsod", "network", "generic").
    pub category: String,
    /// Display title for the flow.
    #[serde(default)]
    pub title: String,
}

/// Outcome of executing one node. Immutable once appended to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: String,
    pub label: String,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time spent in the node, in milliseconds.
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl NodeResult {
    pub fn done(
        node_id: impl Into<String>,
        label: impl Into<String>,
        output: serde_json::Value,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            label: label.into(),
            status: NodeStatus::Done,
            output: Some(output),
            error: None,
            elapsed_ms,
        }
    }

    pub fn error(
        node_id: impl Into<String>,
        label: impl Into<String>,
        error: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            label: label.into(),
            status: NodeStatus::Error,
            output: None,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == NodeStatus::Error
    }
}

/// Lifecycle and status events published for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    /// The run has started.
    FlowStarted {
        run_id: RunId,
        meta: FlowMeta,
        timestamp: DateTime<Utc>,
    },
    /// A node changed status.
    NodeStatus {
        run_id: RunId,
        node_id: String,
        status: NodeStatus,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// The run has ended, either by exhausting its nodes or by stopping early.
    FlowFinished {
        run_id: RunId,
        results: Vec<NodeResult>,
        timestamp: DateTime<Utc>,
    },
}

impl FlowEvent {
    pub fn flow_started(run_id: &RunId, meta: &FlowMeta) -> Self {
        Self::FlowStarted {
            run_id: run_id.clone(),
            meta: meta.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn node_running(run_id: &RunId, node_id: &str, label: &str) -> Self {
        Self::NodeStatus {
            run_id: run_id.clone(),
            node_id: node_id.to_string(),
            status: NodeStatus::Running,
            label: label.to_string(),
            output: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Terminal node event built from the node's result.
    pub fn node_finished(run_id: &RunId, result: &NodeResult) -> Self {
        Self::NodeStatus {
            run_id: run_id.clone(),
            node_id: result.node_id.clone(),
            status: result.status,
            label: result.label.clone(),
            output: result.output.clone(),
            error: result.error.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn flow_finished(run_id: &RunId, results: &[NodeResult]) -> Self {
        Self::FlowFinished {
            run_id: run_id.clone(),
            results: results.to_vec(),
            timestamp: Utc::now(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        match self {
            Self::FlowStarted { run_id, .. }
            | Self::NodeStatus { run_id, .. }
            | Self::FlowFinished { run_id, .. } => run_id,
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlowStarted { .. } => "flow_started",
            Self::NodeStatus { .. } => "node_status",
            Self::FlowFinished { .. } => "flow_finished",
        }
    }
}
