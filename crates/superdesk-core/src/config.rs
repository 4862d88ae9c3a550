use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SuperdeskError};

/// Top-level Superdesk configuration.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pause after each successful node, in milliseconds.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Per-run event buffer before slow subscribers start lagging.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_step_delay_ms() -> u64 { 1000 }
fn default_event_capacity() -> usize { 64 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitiesConfig {
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
}

/// Simulated hardware diagnostic probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(default = "default_hardware_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_hardware_timeout")]
    pub timeout_secs: u64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_hardware_delay_ms(),
            timeout_secs: default_hardware_timeout(),
        }
    }
}

fn default_hardware_delay_ms() -> u64 { 3000 }
fn default_hardware_timeout() -> u64 { 60 }

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model_id: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model_id: default_llm_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_model() -> String { "gemini-2.5-flash".to_string() }
fn default_llm_timeout() -> u64 { 60 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default = "default_news_timeout")]
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            timeout_secs: default_news_timeout(),
        }
    }
}

fn default_news_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Articles searched in addition to the built-in seed set.
    #[serde(default)]
    pub articles: Vec<KbArticle>,
    #[serde(default = "default_kb_max_results")]
    pub max_results: usize,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            articles: vec![],
            max_results: default_kb_max_results(),
        }
    }
}

fn default_kb_max_results() -> usize { 2 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbArticle {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| SuperdeskError::ConfigNotFound(path.display().to_string()))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text, with env var expansion.
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| SuperdeskError::Config(e.to_string()))
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Unset variables stay literal
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}
