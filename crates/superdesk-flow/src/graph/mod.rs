//! Flow graph model.
//!
//! A flow is an ordered list of `Node`s plus `Edge`s between them. Edges
//! describe the suggested order for display only: runs execute nodes in
//! list order and never consult the edges. Whether edges should ever drive
//! scheduling is an open question, so the executor deliberately stays linear.

pub mod edge;
pub mod flow;
pub mod node;

pub use edge::Edge;
pub use flow::Flow;
pub use node::{Node, NodeKind};
