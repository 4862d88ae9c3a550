use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::CapabilityId;

/// An opaque operation a flow node is routed to.
///
/// The engine treats every capability as a black box: it hands over the
/// node label (or a synthesized instruction) and receives either a JSON
/// value or an error.
pub trait Capability: Send + Sync + 'static {
    /// Which routing target this capability serves.
    fn id(&self) -> CapabilityId;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Invoke the capability with the routed input.
    fn invoke(&self, input: String) -> BoxFuture<'_, Result<serde_json::Value>>;

    /// Timeout in seconds for a single invocation.
    fn timeout_secs(&self) -> u64 {
        30
    }
}
