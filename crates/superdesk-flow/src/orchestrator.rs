use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use superdesk_core::event::EventChannel;
use superdesk_core::types::{FlowEvent, NodeResult, NodeStatus, RunId};

use crate::executor::NodeExecutor;
use crate::graph::Flow;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Started,
    Running,
    Finished,
}

/// One execution of a flow.
///
/// `results` is always a prefix of the flow's nodes: a failed node ends the
/// run, so nothing after it is attempted.
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    pub run_id: RunId,
    pub flow: Flow,
    pub status: RunStatus,
    pub results: Vec<NodeResult>,
    /// Stopped by its cancellation token before exhausting the flow.
    pub cancelled: bool,
    pub total_elapsed_ms: u64,
}

impl Run {
    fn start(run_id: RunId, flow: Flow) -> Self {
        Self {
            run_id,
            flow,
            status: RunStatus::Started,
            results: Vec::new(),
            cancelled: false,
            total_elapsed_ms: 0,
        }
    }

    /// Every node ran and succeeded.
    pub fn succeeded(&self) -> bool {
        !self.cancelled
            && self.results.len() == self.flow.len()
            && self.results.iter().all(|r| r.status == NodeStatus::Done)
    }

    /// Ended early because its last node failed.
    pub fn aborted(&self) -> bool {
        self.results.last().is_some_and(NodeResult::is_error)
    }

    /// The node result that stopped the run, if any.
    pub fn failure(&self) -> Option<&NodeResult> {
        self.results.last().filter(|r| r.is_error())
    }

    pub fn into_results(self) -> Vec<NodeResult> {
        self.results
    }
}

/// Drives runs: nodes execute one at a time in list order, stopping at the
/// first error.
///
/// Edges are not consulted. Distinct runs share nothing but the event
/// channel, so one orchestrator can serve many concurrent runs.
pub struct FlowOrchestrator {
    executor: NodeExecutor,
}

impl FlowOrchestrator {
    pub fn new(executor: NodeExecutor) -> Self {
        Self { executor }
    }

    pub fn events(&self) -> &EventChannel {
        self.executor.events()
    }

    /// Execute a flow to completion or to its first failing node.
    pub async fn run(&self, run_id: RunId, flow: &Flow) -> Run {
        self.run_with_cancel(run_id, flow, CancellationToken::new())
            .await
    }

    /// Execute a flow, checking `cancel` before each node.
    ///
    /// Cancellation never interrupts a node already in progress; it only
    /// prevents the next one from starting. `flow_finished` is still published.
    pub async fn run_with_cancel(
        &self,
        run_id: RunId,
        flow: &Flow,
        cancel: CancellationToken,
    ) -> Run {
        let start = Instant::now();
        let events = self.executor.events();
        let mut run = Run::start(run_id, flow.clone());

        info!(
            run_id = %run.run_id,
            category = %flow.meta().category,
            nodes = flow.len(),
            "Flow run started"
        );
        events.publish(FlowEvent::flow_started(&run.run_id, flow.meta()));
        run.status = RunStatus::Running;

        for node in flow.nodes() {
            if cancel.is_cancelled() {
                warn!(run_id = %run.run_id, node_id = %node.id, "Run cancelled before node");
                run.cancelled = true;
                break;
            }

            let result = self.executor.execute(&run.run_id, node).await;
            let failed = result.is_error();
            run.results.push(result);

            if failed {
                warn!(run_id = %run.run_id, node_id = %node.id, "Node failed, stopping run");
                break;
            }
        }

        run.status = RunStatus::Finished;
        run.total_elapsed_ms = start.elapsed().as_millis() as u64;
        events.publish(FlowEvent::flow_finished(&run.run_id, &run.results));

        info!(
            run_id = %run.run_id,
            executed = run.results.len(),
            succeeded = run.succeeded(),
            cancelled = run.cancelled,
            elapsed_ms = run.total_elapsed_ms,
            "Flow run finished"
        );
        run
    }

    /// Run a flow on its own task.
    pub fn spawn(self: &Arc<Self>, run_id: RunId, flow: Flow) -> JoinHandle<Run> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(run_id, &flow).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate;
    use crate::graph::Node;
    use superdesk_core::types::{CapabilityId, FlowMeta};
    use superdesk_test_utils::{all_succeeding, drain, event_trace, mock_registry, MockCapability};

    fn orchestrator(caps: Vec<MockCapability>) -> FlowOrchestrator {
        let executor = NodeExecutor::new(Arc::new(mock_registry(caps)), EventChannel::new(64));
        FlowOrchestrator::new(executor)
    }

    fn meta() -> FlowMeta {
        FlowMeta {
            issue: "test".into(),
            category: "generic".into(),
            title: String::new(),
        }
    }

    #[tokio::test]
    async fn test_all_nodes_succeed() {
        let orch = orchestrator(all_succeeding());
        let flow = generate("blue screen on boot");
        let run = orch.run(RunId::new(), &flow).await;

        assert_eq!(run.status, RunStatus::Finished);
        assert_eq!(run.results.len(), flow.len());
        assert!(run.results.iter().all(|r| r.status == NodeStatus::Done));
        assert!(run.succeeded());
        assert!(!run.aborted());
        for (result, node) in run.results.iter().zip(flow.nodes()) {
            assert_eq!(result.node_id, node.id);
        }
    }

    #[tokio::test]
    async fn test_fail_fast_truncates_results() {
        let llm = MockCapability::succeeding(CapabilityId::Reasoning);
        let orch = orchestrator(vec![
            MockCapability::succeeding(CapabilityId::KnowledgeBase),
            llm.clone(),
            MockCapability::failing(CapabilityId::HardwareDiagnostic, "memtest error"),
        ]);
        let flow = generate("bsod");
        let run_id = RunId::from_str("run-fail");
        let mut sub = orch.events().subscribe(&run_id);

        let run = orch.run(run_id.clone(), &flow).await;

        // Third node (hardware diagnostics) fails; the fourth never runs.
        assert_eq!(run.results.len(), 3);
        assert_eq!(run.results[2].status, NodeStatus::Error);
        assert!(run.aborted());
        assert!(!run.succeeded());
        assert_eq!(run.failure().map(|r| r.node_id.as_str()), Some(flow.nodes()[2].id.as_str()));
        // Only the second node fell back to reasoning.
        assert_eq!(llm.calls().len(), 1);

        let events = drain(&mut sub);
        let last_node = &flow.nodes()[3].id;
        assert!(!events.iter().any(|e| matches!(
            e,
            FlowEvent::NodeStatus { node_id, .. } if node_id == last_node
        )));
        assert_eq!(
            event_trace(&events),
            vec![
                "flow_started",
                "node_status:running",
                "node_status:done",
                "node_status:running",
                "node_status:done",
                "node_status:running",
                "node_status:error",
                "flow_finished",
            ]
        );
    }

    #[tokio::test]
    async fn test_first_node_failure() {
        let orch = orchestrator(vec![MockCapability::failing(CapabilityId::KnowledgeBase, "kb down")]);
        let flow = generate("printer jammed");
        let run = orch.run(RunId::new(), &flow).await;

        assert_eq!(run.results.len(), 1);
        assert!(run.aborted());
    }

    #[tokio::test]
    async fn test_event_order_and_finished_payload() {
        let orch = orchestrator(all_succeeding());
        let flow = generate("my wifi keeps dropping");
        let run_id = RunId::from_str("run-order");
        let mut sub = orch.events().subscribe(&run_id);

        let run = orch.run(run_id.clone(), &flow).await;
        let events = drain(&mut sub);

        assert_eq!(
            event_trace(&events),
            vec![
                "flow_started",
                "node_status:running",
                "node_status:done",
                "node_status:running",
                "node_status:done",
                "node_status:running",
                "node_status:done",
                "flow_finished",
            ]
        );
        match events.first() {
            Some(FlowEvent::FlowStarted { meta, .. }) => assert_eq!(meta.category, "network"),
            other => panic!("unexpected first event: {other:?}"),
        }
        match events.last() {
            Some(FlowEvent::FlowFinished { results, .. }) => assert_eq!(results, &run.results),
            other => panic!("unexpected last event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let kb = MockCapability::succeeding(CapabilityId::KnowledgeBase);
        let orch = orchestrator(vec![kb.clone()]);
        let flow = generate("anything");
        let run_id = RunId::from_str("run-cancel");
        let mut sub = orch.events().subscribe(&run_id);

        let token = CancellationToken::new();
        token.cancel();
        let run = orch.run_with_cancel(run_id, &flow, token).await;

        assert!(run.cancelled);
        assert!(run.results.is_empty());
        assert!(!run.succeeded());
        assert!(kb.calls().is_empty());
        assert_eq!(event_trace(&drain(&mut sub)), vec!["flow_started", "flow_finished"]);
    }

    #[tokio::test]
    async fn test_cancel_between_nodes() {
        let token = CancellationToken::new();
        let kb = MockCapability::succeeding(CapabilityId::KnowledgeBase).cancel_on_call(token.clone());
        let orch = orchestrator(vec![kb, MockCapability::succeeding(CapabilityId::Reasoning)]);
        let flow = generate("printer jammed");

        let run = orch.run_with_cancel(RunId::new(), &flow, token).await;

        // The first node completes; the second is never started.
        assert!(run.cancelled);
        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].status, NodeStatus::Done);
    }

    #[tokio::test]
    async fn test_edges_do_not_affect_order() {
        let nodes = vec![Node::new("a", "KB first"), Node::new("b", "News second")];
        // Edge points backwards; execution still follows list order.
        let flow = Flow::new(nodes, vec![crate::graph::Edge::link("b", "a")], meta()).unwrap();
        let orch = orchestrator(all_succeeding());

        let run = orch.run(RunId::new(), &flow).await;
        let order: Vec<&str> = run.results.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_flow() {
        let flow = Flow::new(vec![], vec![], meta()).unwrap();
        let run = orchestrator(vec![]).run(RunId::new(), &flow).await;
        assert!(run.results.is_empty());
        assert!(run.succeeded());
        assert_eq!(run.status, RunStatus::Finished);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_runs_are_isolated() {
        let orch = Arc::new(orchestrator(all_succeeding()));
        let run_a = RunId::from_str("run-a");
        let run_b = RunId::from_str("run-b");
        let mut sub_a = orch.events().subscribe(&run_a);
        let mut sub_b = orch.events().subscribe(&run_b);

        let flow_a = generate("bsod");
        let flow_b = generate("wifi");
        let handle_a = orch.spawn(run_a.clone(), flow_a.clone());
        let handle_b = orch.spawn(run_b.clone(), flow_b.clone());
        let (a, b) = (handle_a.await.unwrap(), handle_b.await.unwrap());

        assert_eq!(a.results.len(), 4);
        assert_eq!(b.results.len(), 3);

        let events_a = drain(&mut sub_a);
        let events_b = drain(&mut sub_b);
        assert_eq!(events_a.len(), 2 + 2 * 4);
        assert_eq!(events_b.len(), 2 + 2 * 3);
        assert!(events_a.iter().all(|e| e.run_id() == &run_a));
        assert!(events_b.iter().all(|e| e.run_id() == &run_b));
    }
}
