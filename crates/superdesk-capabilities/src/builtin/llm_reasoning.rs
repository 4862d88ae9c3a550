use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use superdesk_core::config::LlmConfig;
use superdesk_core::error::{Result, SuperdeskError};
use superdesk_core::traits::Capability;
use superdesk_core::types::CapabilityId;

/// Free-form reasoning over a step through an OpenAI-compatible endpoint.
pub struct LlmReasoning {
    config: LlmConfig,
}

impl LlmReasoning {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    fn endpoint(&self) -> Option<String> {
        self.config
            .base_url
            .as_deref()
            .map(|base| format!("{}/chat/completions", base.trim_end_matches('/')))
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn fail(message: impl Into<String>) -> SuperdeskError {
    SuperdeskError::capability(CapabilityId::Reasoning, message)
}

impl Capability for LlmReasoning {
    fn id(&self) -> CapabilityId {
        CapabilityId::Reasoning
    }

    fn description(&self) -> &str {
        "Ask the language model to reason about or perform a troubleshooting step."
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout_secs
    }

    fn invoke(&self, input: String) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            let url = self.endpoint().ok_or_else(|| fail("no LLM endpoint configured"))?;

            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(self.config.timeout_secs))
                .build()
                .map_err(|e| fail(e.to_string()))?;

            let body = json!({
                "model": self.config.model_id,
                "messages": [{ "role": "user", "content": input }],
            });

            let mut req = client.post(&url).json(&body);
            if let Some(ref api_key) = self.config.api_key {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }

            debug!(model = %self.config.model_id, "Sending reasoning request");
            let resp = req.send().await.map_err(|e| fail(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(fail(format!("HTTP {}: {}", status.as_u16(), text)));
            }

            let parsed: CompletionResponse = resp
                .json()
                .await
                .map_err(|e| fail(format!("invalid completion response: {}", e)))?;

            let text = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| fail("completion contained no text"))?;

            Ok(json!({ "text": text }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let cap = LlmReasoning::new(LlmConfig {
            base_url: Some("http://localhost:11434/v1/".into()),
            ..LlmConfig::default()
        });
        assert_eq!(
            cap.endpoint().as_deref(),
            Some("http://localhost:11434/v1/chat/completions")
        );
    }

    #[tokio::test]
    async fn test_unconfigured_endpoint_fails() {
        let cap = LlmReasoning::new(LlmConfig::default());
        let err = cap.invoke("Perform step: check cables".into()).await.unwrap_err();
        assert!(matches!(
            err,
            SuperdeskError::Capability { capability: CapabilityId::Reasoning, .. }
        ));
    }
}
