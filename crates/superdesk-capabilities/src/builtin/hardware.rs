use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::json;
use tracing::debug;

use superdesk_core::config::HardwareConfig;
use superdesk_core::error::Result;
use superdesk_core::traits::Capability;
use superdesk_core::types::CapabilityId;

/// Stand-in for a long-running hardware probe (RAM / disk checks).
///
/// Waits for the configured delay and reports success; the real probe is
/// platform specific and lives outside the engine.
pub struct HardwareDiagnostic {
    config: HardwareConfig,
}

impl HardwareDiagnostic {
    pub fn new(config: HardwareConfig) -> Self {
        Self { config }
    }
}

impl Capability for HardwareDiagnostic {
    fn id(&self) -> CapabilityId {
        CapabilityId::HardwareDiagnostic
    }

    fn description(&self) -> &str {
        "Run hardware diagnostics (simulated long-running probe)."
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout_secs
    }

    fn invoke(&self, input: String) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            debug!(step = %input, delay_ms = self.config.delay_ms, "Hardware diagnostic started");
            tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
            Ok(json!({ "result": "diag done", "ok": true }))
        })
    }
}
