//! Troubleshooting flow engine.
//!
//! An issue string becomes a `Flow` via the `generator`; the
//! `FlowOrchestrator` then runs its nodes in order, each routed to a
//! capability by the `router` and executed by the `NodeExecutor`, with
//! status events published per run on the `EventChannel`.

pub mod executor;
pub mod generator;
pub mod graph;
pub mod orchestrator;
pub mod router;

pub use executor::NodeExecutor;
pub use generator::{generate, FlowTemplate};
pub use graph::{Edge, Flow, Node, NodeKind};
pub use orchestrator::{FlowOrchestrator, Run, RunStatus};
pub use router::{resolve, route, Route};
