//! Flow generator: turns an issue description into a troubleshooting flow.
//!
//! Templates are checked top to bottom against the lower-cased issue text;
//! the first whose keywords match wins. An issue matching nothing gets the
//! generic template, so generation never fails.

use tracing::debug;

use superdesk_core::types::FlowMeta;

use crate::graph::Flow;

/// A fixed, human-authored troubleshooting plan.
#[derive(Debug, Clone, Copy)]
pub struct FlowTemplate {
    /// Recorded as `meta.category` when this template fires.
    pub category: &'static str,
    /// Any of these substrings in the lower-cased issue selects the template.
    pub keywords: &'static [&'static str],
    /// Step labels in execution order.
    pub labels: &'static [&'static str],
}

impl FlowTemplate {
    fn matches(&self, issue_lower: &str) -> bool {
        self.keywords.iter().any(|k| issue_lower.contains(k))
    }
}

/// Keyword templates, in priority order.
pub const TEMPLATES: &[FlowTemplate] = &[
    FlowTemplate {
        category: "bsod",
        keywords: &["blue screen", "bsod"],
        labels: &[
            "Collect basics: model, OS, error code",
            "Check boot behavior / BIOS / Safe Mode",
            "Run hardware diagnostics (RAM / Disk)",
            "Backup data & OS Repair / Reinstall",
        ],
    },
    FlowTemplate {
        category: "network",
        keywords: &["wifi", "wi-fi"],
        labels: &[
            "Check Airplane Mode & Wi-Fi toggle",
            "Restart router & reconnect",
            "Reset network settings / ISP",
        ],
    },
];

/// Used when no keyword template matches.
pub const GENERIC: FlowTemplate = FlowTemplate {
    category: "generic",
    keywords: &[],
    labels: &[
        "Collect details & logs",
        "KB / News / Web search",
        "LLM reasoning -> Suggest remedial steps",
    ],
};

/// Pick the template for an issue.
pub fn template_for(issue: &str) -> &'static FlowTemplate {
    let issue_lower = issue.to_lowercase();
    TEMPLATES
        .iter()
        .find(|t| t.matches(&issue_lower))
        .unwrap_or(&GENERIC)
}

/// Generate a flow for an issue.
///
/// Node ids are fresh on every call, so two calls with the same issue give
/// structurally identical flows with distinct ids.
pub fn generate(issue: &str) -> Flow {
    let template = template_for(issue);
    debug!(category = template.category, "Generating flow from template");

    let meta = FlowMeta {
        issue: issue.to_string(),
        category: template.category.to_string(),
        title: format!("Troubleshooter: {}", issue),
    };
    Flow::linear(template.labels.iter().copied(), meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bsod_scenario() {
        let flow = generate("blue screen on boot");
        assert_eq!(flow.meta().category, "bsod");
        assert_eq!(flow.len(), 4);
        assert_eq!(flow.edges().len(), 3);
        assert_eq!(flow.topology(), vec![(0, 1), (1, 2), (2, 3)]);
        assert!(flow.labels()[0].contains("Collect basics"));
    }

    #[test]
    fn test_bsod_keyword_case_insensitive() {
        assert_eq!(generate("Got a BSOD again").meta().category, "bsod");
    }

    #[test]
    fn test_network_scenario() {
        let flow = generate("my wifi keeps dropping");
        assert_eq!(flow.meta().category, "network");
        assert_eq!(flow.len(), 3);

        let labels = flow.labels();
        assert!(labels[0].contains("Airplane Mode") && labels[0].contains("toggle"));
        assert!(labels[1].contains("Restart router"));
        assert!(labels[2].contains("Reset") && labels[2].contains("ISP"));
    }

    #[test]
    fn test_first_matching_template_wins() {
        // Mentions both; bsod is checked first.
        assert_eq!(generate("wifi died then blue screen").meta().category, "bsod");
    }

    #[test]
    fn test_generic_fallback() {
        for issue in ["printer is jammed", "", "   ", "outlook keeps crashing"] {
            let flow = generate(issue);
            assert_eq!(flow.meta().category, "generic");
            assert_eq!(flow.len(), 3);
            assert_eq!(flow.meta().issue, issue);
        }
    }

    #[test]
    fn test_meta_preserves_issue_verbatim() {
        let issue = "  My WiFi Keeps Dropping!! ";
        let flow = generate(issue);
        assert_eq!(flow.meta().issue, issue);
        assert_eq!(flow.meta().title, format!("Troubleshooter: {}", issue));
    }

    #[test]
    fn test_generation_is_structurally_idempotent() {
        let a = generate("wifi issue");
        let b = generate("wifi issue");
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.topology(), b.topology());
        for (x, y) in a.nodes().iter().zip(b.nodes()) {
            assert_ne!(x.id, y.id);
        }
    }

    #[test]
    fn test_every_template_has_no_dangling_edges() {
        for template in TEMPLATES.iter().chain(std::iter::once(&GENERIC)) {
            assert!((2..=4).contains(&template.labels.len()));
            let flow = generate(template.keywords.first().copied().unwrap_or("anything"));
            assert_eq!(flow.meta().category, template.category);
            for edge in flow.edges() {
                assert!(flow.node(&edge.source).is_some());
                assert!(flow.node(&edge.target).is_some());
            }
        }
    }
}
