use std::collections::HashMap;
use std::sync::Arc;

use superdesk_core::config::CapabilitiesConfig;
use superdesk_core::error::{Result, SuperdeskError};
use superdesk_core::traits::Capability;
use superdesk_core::types::CapabilityId;

/// Registry of available capabilities, keyed by routing target.
pub struct CapabilityRegistry {
    capabilities: HashMap<CapabilityId, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Register a capability, replacing any previous one with the same id.
    pub fn register(&mut self, capability: impl Capability) {
        self.register_arc(Arc::new(capability));
    }

    /// Register an already shared capability.
    pub fn register_arc(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities.insert(capability.id(), capability);
    }

    /// Unregister a capability by id.
    pub fn unregister(&mut self, id: CapabilityId) -> bool {
        self.capabilities.remove(&id).is_some()
    }

    /// Get a capability by id.
    pub fn get(&self, id: CapabilityId) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(&id).cloned()
    }

    /// List registered capability ids.
    pub fn list(&self) -> Vec<CapabilityId> {
        let mut ids: Vec<_> = self.capabilities.keys().copied().collect();
        ids.sort_by_key(|id| id.as_str());
        ids
    }

    /// Invoke a capability by id, bounded by its timeout.
    pub async fn invoke(&self, id: CapabilityId, input: String) -> Result<serde_json::Value> {
        let capability = self.get(id).ok_or(SuperdeskError::CapabilityNotFound(id))?;

        let timeout_secs = capability.timeout_secs();
        let timeout = std::time::Duration::from_secs(timeout_secs);

        match tokio::time::timeout(timeout, capability.invoke(input)).await {
            Ok(result) => result,
            Err(_) => Err(SuperdeskError::CapabilityTimeout {
                capability: id,
                timeout_secs,
            }),
        }
    }

    /// Create a registry with all built-in capabilities registered.
    pub fn with_builtins(config: &CapabilitiesConfig) -> Self {
        let mut registry = Self::new();
        registry.register(crate::builtin::KnowledgeBaseSearch::from_config(&config.knowledge_base));
        registry.register(crate::builtin::NewsFetch::new(config.news.clone()));
        registry.register(crate::builtin::LlmReasoning::new(config.llm.clone()));
        registry.register(crate::builtin::HardwareDiagnostic::new(config.hardware.clone()));
        registry
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
