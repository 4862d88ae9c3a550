use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{debug, warn};

use superdesk_capabilities::CapabilityRegistry;
use superdesk_core::error::{Result, SuperdeskError};
use superdesk_core::event::EventChannel;
use superdesk_core::types::{FlowEvent, NodeResult, RunId};

use crate::graph::Node;
use crate::router::{self, Route};

/// Runs a single node: routes it, invokes the capability, and reports.
///
/// This is the isolation boundary for capability failures. Errors, panics,
/// timeouts and `{"ok": false}` replies all become an `error` result here;
/// `execute` itself never fails.
pub struct NodeExecutor {
    registry: Arc<CapabilityRegistry>,
    events: EventChannel,
    step_delay: Duration,
}

impl NodeExecutor {
    pub fn new(registry: Arc<CapabilityRegistry>, events: EventChannel) -> Self {
        Self {
            registry,
            events,
            step_delay: Duration::ZERO,
        }
    }

    /// Pause after each successful node before reporting it done.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// Execute one node, publishing `running` then exactly one terminal status.
    pub async fn execute(&self, run_id: &RunId, node: &Node) -> NodeResult {
        self.events
            .publish(FlowEvent::node_running(run_id, &node.id, &node.label));

        let route = router::resolve(&node.label);
        let capability = route.capability;
        debug!(run_id = %run_id, node_id = %node.id, capability = %capability, fallback = route.fallback, "Routing node");

        let start = Instant::now();
        let outcome = self.invoke(route).await;
        if outcome.is_ok() && !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(output) => NodeResult::done(&node.id, &node.label, output, elapsed_ms),
            Err(e) => {
                warn!(run_id = %run_id, node_id = %node.id, capability = %capability, error = %e, "Node failed");
                NodeResult::error(&node.id, &node.label, e.to_string(), elapsed_ms)
            }
        };

        self.events.publish(FlowEvent::node_finished(run_id, &result));
        result
    }

    async fn invoke(&self, route: Route) -> Result<serde_json::Value> {
        let capability = route.capability;
        let call = self.registry.invoke(capability, route.input);

        let output = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result?,
            Err(panic) => {
                return Err(SuperdeskError::capability(
                    capability,
                    format!("panicked: {}", panic_message(panic.as_ref())),
                ))
            }
        };

        if reports_failure(&output) {
            let message = output
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("capability reported failure")
                .to_string();
            return Err(SuperdeskError::capability(capability, message));
        }
        Ok(output)
    }
}

/// A capability may signal failure in-band with `"ok": false`.
fn reports_failure(output: &serde_json::Value) -> bool {
    output.get("ok").and_then(|ok| ok.as_bool()) == Some(false)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superdesk_core::types::{CapabilityId, NodeStatus};
    use superdesk_test_utils::{drain, mock_registry, MockCapability};

    fn executor(caps: Vec<MockCapability>) -> NodeExecutor {
        NodeExecutor::new(Arc::new(mock_registry(caps)), EventChannel::new(16))
    }

    #[tokio::test]
    async fn test_success_emits_running_then_done() {
        let kb = MockCapability::succeeding(CapabilityId::KnowledgeBase);
        let exec = executor(vec![kb.clone()]);
        let run = RunId::from_str("run-1");
        let mut sub = exec.events().subscribe(&run);

        let node = Node::new("n1", "Collect details & logs");
        let result = exec.execute(&run, &node).await;

        assert_eq!(result.status, NodeStatus::Done);
        assert_eq!(result.node_id, "n1");
        assert!(result.output.is_some());
        assert_eq!(kb.calls(), vec!["Collect details & logs".to_string()]);

        let statuses: Vec<NodeStatus> = drain(&mut sub)
            .into_iter()
            .filter_map(|e| match e {
                FlowEvent::NodeStatus { status, .. } => Some(status),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![NodeStatus::Running, NodeStatus::Done]);
    }

    #[tokio::test]
    async fn test_failure_is_converted_not_propagated() {
        let hw = MockCapability::failing(CapabilityId::HardwareDiagnostic, "RAM test failed");
        let exec = executor(vec![hw]);
        let run = RunId::from_str("run-2");
        let mut sub = exec.events().subscribe(&run);

        let result = exec.execute(&run, &Node::new("n3", "Run hardware diagnostics")).await;

        assert_eq!(result.status, NodeStatus::Error);
        assert!(result.output.is_none());
        assert!(result.error.as_deref().unwrap().contains("RAM test failed"));

        let events = drain(&mut sub);
        assert_eq!(events.len(), 2);
        match &events[1] {
            FlowEvent::NodeStatus { status, error, .. } => {
                assert_eq!(*status, NodeStatus::Error);
                assert!(error.is_some());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_capability_becomes_error() {
        let exec = executor(vec![MockCapability::panicking(CapabilityId::News)]);
        let result = exec
            .execute(&RunId::from_str("run-3"), &Node::new("n1", "Check outage news"))
            .await;
        assert_eq!(result.status, NodeStatus::Error);
        assert!(result.error.unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn test_in_band_failure_signal() {
        let hw = MockCapability::returning(
            CapabilityId::HardwareDiagnostic,
            serde_json::json!({ "ok": false, "error": "disk SMART failing" }),
        );
        let exec = executor(vec![hw]);
        let result = exec
            .execute(&RunId::from_str("run-4"), &Node::new("n1", "Hardware check"))
            .await;
        assert_eq!(result.status, NodeStatus::Error);
        assert!(result.error.unwrap().contains("disk SMART failing"));
    }

    #[tokio::test]
    async fn test_unregistered_capability_becomes_error() {
        let exec = executor(vec![]);
        let result = exec
            .execute(&RunId::from_str("run-5"), &Node::new("n1", "Fetch news"))
            .await;
        assert_eq!(result.status, NodeStatus::Error);
        assert!(result.error.unwrap().contains("not registered"));
    }

    #[tokio::test]
    async fn test_fallback_sends_synthesized_instruction() {
        let llm = MockCapability::succeeding(CapabilityId::Reasoning);
        let exec = executor(vec![llm.clone()]);
        exec.execute(&RunId::from_str("run-6"), &Node::new("n1", "Restart router & reconnect"))
            .await;
        assert_eq!(llm.calls(), vec!["Perform step: Restart router & reconnect".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_delay_applies_on_success_only() {
        let exec = executor(vec![
            MockCapability::succeeding(CapabilityId::KnowledgeBase),
            MockCapability::failing(CapabilityId::News, "offline"),
        ])
        .with_step_delay(Duration::from_secs(1));
        let run = RunId::from_str("run-7");

        let start = tokio::time::Instant::now();
        exec.execute(&run, &Node::new("a", "KB lookup")).await;
        assert!(start.elapsed() >= Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        exec.execute(&run, &Node::new("b", "News lookup")).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
