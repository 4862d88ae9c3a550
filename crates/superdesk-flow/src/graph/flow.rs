use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use superdesk_core::error::{Result, SuperdeskError};
use superdesk_core::types::FlowMeta;

use super::edge::Edge;
use super::node::Node;

/// A validated, immutable troubleshooting graph.
///
/// Construction checks that node ids are non-empty and unique and that every
/// edge references known nodes. Deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFlow")]
pub struct Flow {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    meta: FlowMeta,
}

/// Unvalidated wire form of a flow.
#[derive(Deserialize)]
struct RawFlow {
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    meta: FlowMeta,
}

impl TryFrom<RawFlow> for Flow {
    type Error = SuperdeskError;

    fn try_from(raw: RawFlow) -> Result<Self> {
        Flow::new(raw.nodes, raw.edges, raw.meta)
    }
}

impl Flow {
    /// Build a flow, failing with `MalformedGraph` on any structural violation.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>, meta: FlowMeta) -> Result<Self> {
        validate(&nodes, &edges)?;
        Ok(Self { nodes, edges, meta })
    }

    /// Chain labels into fresh task nodes linked `i -> i+1`.
    ///
    /// Ids are generated, so the result is valid by construction.
    pub fn linear<I, S>(labels: I, meta: FlowMeta) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let nodes: Vec<Node> = labels.into_iter().map(|label| Node::task(label)).collect();
        let edges = nodes
            .windows(2)
            .map(|pair| Edge::link(&pair[0].id, &pair[1].id))
            .collect();
        Self { nodes, edges, meta }
    }

    /// Nodes in execution order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn meta(&self) -> &FlowMeta {
        &self.meta
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node labels in order.
    pub fn labels(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.label.as_str()).collect()
    }

    /// Edges as `(source index, target index)` pairs, independent of ids.
    pub fn topology(&self) -> Vec<(usize, usize)> {
        let index = |id: &str| self.nodes.iter().position(|n| n.id == id);
        self.edges
            .iter()
            .filter_map(|e| Some((index(&e.source)?, index(&e.target)?)))
            .collect()
    }
}

fn validate(nodes: &[Node], edges: &[Edge]) -> Result<()> {
    let mut ids = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if node.id.is_empty() {
            return Err(SuperdeskError::MalformedGraph(format!(
                "node '{}' has an empty id",
                node.label
            )));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(SuperdeskError::MalformedGraph(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
    }

    for edge in edges {
        for endpoint in [&edge.source, &edge.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(SuperdeskError::MalformedGraph(format!(
                    "edge '{}' references unknown node '{}'",
                    edge.id, endpoint
                )));
            }
        }
    }
    Ok(())
}
