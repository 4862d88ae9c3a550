use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::json;

use superdesk_core::config::NewsConfig;
use superdesk_core::error::{Result, SuperdeskError};
use superdesk_core::traits::Capability;
use superdesk_core::types::CapabilityId;

const MAX_BODY_CHARS: usize = 10_000;

/// Fetches recent outage / advisory news from a configured feed.
pub struct NewsFetch {
    config: NewsConfig,
}

impl NewsFetch {
    pub fn new(config: NewsConfig) -> Self {
        Self { config }
    }
}

fn fail(message: impl Into<String>) -> SuperdeskError {
    SuperdeskError::capability(CapabilityId::News, message)
}

impl Capability for NewsFetch {
    fn id(&self) -> CapabilityId {
        CapabilityId::News
    }

    fn description(&self) -> &str {
        "Fetch recent news related to a troubleshooting step."
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout_secs
    }

    fn invoke(&self, input: String) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            let url = self
                .config
                .feed_url
                .as_deref()
                .ok_or_else(|| fail("no news feed configured"))?;

            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(self.config.timeout_secs))
                .build()
                .map_err(|e| fail(e.to_string()))?;

            let resp = client
                .get(url)
                .query(&[("q", input.as_str())])
                .send()
                .await
                .map_err(|e| fail(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(fail(format!("feed returned HTTP {}", status.as_u16())));
            }

            let body = resp.text().await.map_err(|e| fail(e.to_string()))?;
            let truncated: String = body.chars().take(MAX_BODY_CHARS).collect();

            Ok(json!({ "query": input, "status": status.as_u16(), "body": truncated }))
        })
    }
}
