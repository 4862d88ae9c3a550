//! Mocks and helpers shared by Superdesk tests.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use superdesk_capabilities::CapabilityRegistry;
use superdesk_core::error::{Result, SuperdeskError};
use superdesk_core::event::Subscription;
use superdesk_core::traits::Capability;
use superdesk_core::types::{CapabilityId, FlowEvent};

#[derive(Clone)]
enum Behavior {
    Return(serde_json::Value),
    Fail(String),
    Panic,
}

/// Scripted capability that records every input it receives.
///
/// Clones share the call log, so keep a clone after registering it.
#[derive(Clone)]
pub struct MockCapability {
    id: CapabilityId,
    behavior: Behavior,
    calls: Arc<Mutex<Vec<String>>>,
    cancel_on_call: Option<CancellationToken>,
}

impl MockCapability {
    fn with_behavior(id: CapabilityId, behavior: Behavior) -> Self {
        Self {
            id,
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
            cancel_on_call: None,
        }
    }

    /// Succeeds with `{"ok": true, "capability": <id>, "input": <input>}`.
    pub fn succeeding(id: CapabilityId) -> Self {
        Self::with_behavior(id, Behavior::Return(json!({ "ok": true })))
    }

    /// Succeeds with a fixed value.
    pub fn returning(id: CapabilityId, value: serde_json::Value) -> Self {
        Self::with_behavior(id, Behavior::Return(value))
    }

    /// Fails with a capability error carrying `message`.
    pub fn failing(id: CapabilityId, message: impl Into<String>) -> Self {
        Self::with_behavior(id, Behavior::Fail(message.into()))
    }

    /// Panics when invoked.
    pub fn panicking(id: CapabilityId) -> Self {
        Self::with_behavior(id, Behavior::Panic)
    }

    /// Cancel `token` whenever this capability is invoked.
    pub fn cancel_on_call(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    /// Inputs received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Capability for MockCapability {
    fn id(&self) -> CapabilityId {
        self.id
    }

    fn description(&self) -> &str {
        "mock capability"
    }

    fn invoke(&self, input: String) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(input.clone());
            if let Some(ref token) = self.cancel_on_call {
                token.cancel();
            }
            match &self.behavior {
                Behavior::Return(value) => {
                    let mut value = value.clone();
                    if let Some(obj) = value.as_object_mut() {
                        obj.entry("capability").or_insert(json!(self.id.as_str()));
                        obj.entry("input").or_insert(json!(input));
                    }
                    Ok(value)
                }
                Behavior::Fail(message) => Err(SuperdeskError::capability(self.id, message.clone())),
                Behavior::Panic => panic!("mock capability {} panicked", self.id),
            }
        })
    }
}

/// Build a registry from mocks.
pub fn mock_registry(capabilities: Vec<MockCapability>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    for capability in capabilities {
        registry.register(capability);
    }
    registry
}

/// One succeeding mock per capability.
pub fn all_succeeding() -> Vec<MockCapability> {
    CapabilityId::ALL
        .into_iter()
        .map(MockCapability::succeeding)
        .collect()
}

/// Take every event already delivered to a subscription.
pub fn drain(subscription: &mut Subscription) -> Vec<FlowEvent> {
    std::iter::from_fn(|| subscription.try_recv()).collect()
}

/// Compact event sequence: `flow_started`, `node_status:<status>`, `flow_finished`.
pub fn event_trace(events: &[FlowEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| match e {
            FlowEvent::NodeStatus { status, .. } => format!("node_status:{}", status),
            other => other.name().to_string(),
        })
        .collect()
}
