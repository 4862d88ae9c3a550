//! Handler router: maps a node label to the capability that handles it.
//!
//! An explicit rule table evaluated top to bottom against the lower-cased
//! label; the first rule with a matching substring wins. Labels matching no
//! rule go to the reasoning capability with a synthesized instruction.

use serde::Serialize;

use superdesk_core::types::CapabilityId;

/// One routing rule: any keyword present selects the capability.
#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    pub keywords: &'static [&'static str],
    pub capability: CapabilityId,
}

/// Routing rules, in priority order.
pub const ROUTING_RULES: &[RouteRule] = &[
    RouteRule {
        keywords: &["kb", "collect"],
        capability: CapabilityId::KnowledgeBase,
    },
    RouteRule {
        keywords: &["news"],
        capability: CapabilityId::News,
    },
    RouteRule {
        keywords: &["llm", "reason"],
        capability: CapabilityId::Reasoning,
    },
    RouteRule {
        keywords: &["diagnostic", "hardware"],
        capability: CapabilityId::HardwareDiagnostic,
    },
];

/// Capability used when no rule matches.
pub const FALLBACK: CapabilityId = CapabilityId::Reasoning;

/// Where a label goes and what the capability receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub capability: CapabilityId,
    /// The label itself, or the synthesized instruction on fallback.
    pub input: String,
    pub fallback: bool,
}

/// Name the capability for a label.
pub fn route(label: &str) -> CapabilityId {
    resolve(label).capability
}

/// Resolve a label to its capability and the input to invoke it with.
pub fn resolve(label: &str) -> Route {
    let label_lower = label.to_lowercase();
    let rule = ROUTING_RULES
        .iter()
        .find(|r| r.keywords.iter().any(|k| label_lower.contains(k)));

    match rule {
        Some(rule) => Route {
            capability: rule.capability,
            input: label.to_string(),
            fallback: false,
        },
        None => Route {
            capability: FALLBACK,
            input: format!("Perform step: {}", label),
            fallback: true,
        },
    }
}
