use futures::future::BoxFuture;
use serde_json::json;

use superdesk_core::config::{KbArticle, KnowledgeBaseConfig};
use superdesk_core::error::Result;
use superdesk_core::traits::Capability;
use superdesk_core::types::CapabilityId;

/// Keyword search over a small in-memory knowledge base.
pub struct KnowledgeBaseSearch {
    articles: Vec<KbArticle>,
    max_results: usize,
}

impl KnowledgeBaseSearch {
    pub fn new(articles: Vec<KbArticle>, max_results: usize) -> Self {
        Self {
            articles,
            max_results: max_results.max(1),
        }
    }

    /// Seed articles plus any configured ones.
    pub fn from_config(config: &KnowledgeBaseConfig) -> Self {
        let mut articles = seed_articles();
        articles.extend(config.articles.iter().cloned());
        Self::new(articles, config.max_results)
    }

    /// Rank articles by how many query terms they mention.
    pub fn search(&self, query: &str) -> Vec<(&KbArticle, usize)> {
        let terms = terms(query);
        let mut scored: Vec<(&KbArticle, usize)> = self
            .articles
            .iter()
            .map(|a| (a, score(a, &terms)))
            .filter(|(_, s)| *s > 0)
            .collect();
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(self.max_results);
        scored
    }
}

impl Capability for KnowledgeBaseSearch {
    fn id(&self) -> CapabilityId {
        CapabilityId::KnowledgeBase
    }

    fn description(&self) -> &str {
        "Search the IT-support knowledge base for articles matching a step."
    }

    fn invoke(&self, input: String) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            let matches: Vec<serde_json::Value> = self
                .search(&input)
                .into_iter()
                .map(|(a, score)| json!({ "title": a.title, "body": a.body, "score": score }))
                .collect();
            Ok(json!({ "query": input, "matches": matches }))
        })
    }
}

fn terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_string)
        .collect()
}

fn score(article: &KbArticle, terms: &[String]) -> usize {
    let haystack = format!(
        "{} {} {}",
        article.title,
        article.body,
        article.tags.join(" ")
    )
    .to_lowercase();
    terms.iter().filter(|t| haystack.contains(t.as_str())).count()
}

fn article(title: &str, body: &str, tags: &[&str]) -> KbArticle {
    KbArticle {
        title: title.to_string(),
        body: body.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn seed_articles() -> Vec<KbArticle> {
    vec![
        article(
            "Blue screen (BSOD) after update",
            "Note the stop code, boot into Safe Mode, roll back the latest driver or update, then run memory and disk checks.",
            &["bsod", "boot", "driver", "crash"],
        ),
        article(
            "Wi-Fi keeps disconnecting",
            "Confirm airplane mode is off, forget and rejoin the network, update the wireless driver, and restart the router.",
            &["wifi", "network", "wireless", "router"],
        ),
        article(
            "Collecting system logs",
            "Export the System and Application event logs and note model, OS build, and recent error codes before escalating.",
            &["logs", "collect", "details", "basics"],
        ),
        article(
            "Slow startup",
            "Disable unneeded startup apps, check disk health, and make sure pending updates have finished installing.",
            &["boot", "performance", "startup"],
        ),
    ]
}
