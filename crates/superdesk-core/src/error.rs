use thiserror::Error;

use crate::types::CapabilityId;

#[derive(Debug, Error)]
pub enum SuperdeskError {
    // Graph errors
    #[error("Malformed graph: {0}")]
    MalformedGraph(String),

    // Capability errors
    #[error("Capability not registered: {0}")]
    CapabilityNotFound(CapabilityId),

    #[error("Capability failed: {capability}: {message}")]
    Capability {
        capability: CapabilityId,
        message: String,
    },

    #[error("Capability timeout after {timeout_secs}s: {capability}")]
    CapabilityTimeout {
        capability: CapabilityId,
        timeout_secs: u64,
    },

    #[error("Capability input rejected: {0}")]
    CapabilityInput(String),

    // Run errors
    #[error("Run cancelled")]
    Cancelled,

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SuperdeskError {
    /// Shorthand for a failed capability call.
    pub fn capability(capability: CapabilityId, message: impl Into<String>) -> Self {
        Self::Capability {
            capability,
            message: message.into(),
        }
    }

    /// Whether this error came from invoking a capability.
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            Self::CapabilityNotFound(_)
                | Self::Capability { .. }
                | Self::CapabilityTimeout { .. }
                | Self::CapabilityInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SuperdeskError>;
