use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use futures::stream::{self, BoxStream};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::types::{FlowEvent, RunId};

type Registry = RwLock<HashMap<RunId, broadcast::Sender<FlowEvent>>>;

/// Per-run event channel.
///
/// Each run id owns its own broadcast channel, created when the first
/// subscriber joins and dropped once the last one leaves. Publishing to a
/// run nobody has joined is a no-op: there is no buffering or replay, so a
/// subscriber only sees events published after it joined.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct EventChannel {
    capacity: usize,
    runs: Arc<Registry>,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Deliver an event to every subscriber currently joined to its run.
    pub fn publish(&self, event: FlowEvent) {
        let runs = self.runs.read().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = runs.get(event.run_id()) {
            // Ignore error if every receiver has gone away
            let _ = tx.send(event);
        }
    }

    /// Join a run's channel.
    pub fn subscribe(&self, run_id: &RunId) -> Subscription {
        let mut runs = self.runs.write().unwrap_or_else(|e| e.into_inner());
        let rx = runs
            .entry(run_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(run_id = %run_id, "Subscriber joined run");
        Subscription {
            run_id: run_id.clone(),
            rx: Some(rx),
            registry: Arc::downgrade(&self.runs),
        }
    }

    /// Drop the run's registration if nobody is subscribed any more.
    pub fn leave(&self, run_id: &RunId) {
        prune(&self.runs, run_id);
    }

    /// Number of live subscribers for a run.
    pub fn subscriber_count(&self, run_id: &RunId) -> usize {
        self.runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(run_id)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Run ids with at least one registration.
    pub fn active_runs(&self) -> Vec<RunId> {
        self.runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

fn prune(registry: &Registry, run_id: &RunId) {
    let mut runs = registry.write().unwrap_or_else(|e| e.into_inner());
    if runs.get(run_id).is_some_and(|tx| tx.receiver_count() == 0) {
        runs.remove(run_id);
        debug!(run_id = %run_id, "Run channel released");
    }
}

/// One subscriber's view of a run. Dropping it leaves the run.
pub struct Subscription {
    run_id: RunId,
    rx: Option<broadcast::Receiver<FlowEvent>>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Wait for the next event. Returns `None` once the channel is closed.
    ///
    /// A subscriber that falls more than the channel capacity behind skips
    /// the oldest events rather than stalling the publisher.
    pub async fn recv(&mut self) -> Option<FlowEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(run_id = %self.run_id, skipped, "Subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<FlowEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(run_id = %self.run_id, skipped, "Subscriber lagged, events dropped");
                }
                Err(_) => return None,
            }
        }
    }

    /// Consume the subscription as a stream that ends after `flow_finished`.
    pub fn into_stream(self) -> BoxStream<'static, FlowEvent> {
        Box::pin(stream::unfold(Some(self), |state| async move {
            let mut sub = state?;
            let event = sub.recv().await?;
            let next = match event {
                FlowEvent::FlowFinished { .. } => None,
                _ => Some(sub),
            };
            Some((event, next))
        }))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.rx.take());
        if let Some(registry) = self.registry.upgrade() {
            prune(&registry, &self.run_id);
        }
    }
}
