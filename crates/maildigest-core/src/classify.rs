//! Keyword classification: message type, category and importance.
//!
//! All three axes share one evaluator over priority-ordered rule lists:
//! the first rule whose keyword set matches wins. Rule order is fixed at
//! compile time so tie-breaks are testable in isolation.
//!
//! Importance deliberately has two incompatible scales used by different
//! pipeline entry points: [`Priority`] (low/medium/high, a counting
//! policy over the daily digest path) and [`Severity`] (normal/high/
//! critical, a presence policy over the per-message detail and heartbeat
//! paths). They are distinct types and must never be compared.

use serde::{Deserialize, Serialize};

use crate::content::StructuredData;

/// One ordered classification rule: a label and its trigger keywords.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule<L> {
    /// Label assigned when any keyword matches.
    pub label: L,
    /// Trigger keywords, matched case-insensitively as substrings.
    pub keywords: &'static [&'static str],
}

/// Evaluates rules in order against a lowercased haystack; first match wins.
fn first_match<L: Copy>(rules: &[KeywordRule<L>], haystack: &str, fallback: L) -> L {
    rules
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| haystack.contains(kw)))
        .map_or(fallback, |rule| rule.label)
}

/// Message type, assigned from the subject only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Capacity/load monitoring report.
    CapacityReport,
    /// Automated inspection report.
    InspectionReport,
    /// Alert notification.
    Alert,
    /// Cost/billing report.
    CostReport,
    /// Security report.
    SecurityReport,
    /// Anything else.
    General,
}

impl MessageType {
    /// Stable label used in reports and structured output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CapacityReport => "capacity_report",
            Self::InspectionReport => "inspection_report",
            Self::Alert => "alert",
            Self::CostReport => "cost_report",
            Self::SecurityReport => "security_report",
            Self::General => "general",
        }
    }

    /// Human-readable name for the digest.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::CapacityReport => "Capacity Report",
            Self::InspectionReport => "Inspection Report",
            Self::Alert => "Alert",
            Self::CostReport => "Cost Report",
            Self::SecurityReport => "Security Report",
            Self::General => "General",
        }
    }
}

const TYPE_RULES: &[KeywordRule<MessageType>] = &[
    KeywordRule {
        label: MessageType::CapacityReport,
        keywords: &["capacity", "load", "arch"],
    },
    KeywordRule {
        label: MessageType::InspectionReport,
        keywords: &["inspection", "check"],
    },
    KeywordRule {
        label: MessageType::Alert,
        keywords: &["alert", "warning"],
    },
    KeywordRule {
        label: MessageType::CostReport,
        keywords: &["cost", "billing"],
    },
    KeywordRule {
        label: MessageType::SecurityReport,
        keywords: &["security", "risk"],
    },
];

/// Classifies the message type from the subject.
#[must_use]
pub fn classify_type(subject: &str) -> MessageType {
    first_match(TYPE_RULES, &subject.to_lowercase(), MessageType::General)
}

/// Importance on the counting scale (daily digest path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// No notable keyword signal.
    Low,
    /// One high hit or two medium hits.
    Medium,
    /// Two or more high hits.
    High,
}

impl Priority {
    /// Stable label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

const HIGH_PRIORITY_WORDS: &[&str] = &[
    "urgent",
    "important",
    "decision",
    "critical",
    "immediate",
    "asap",
    "budget",
    "strategy",
    "roadmap",
    "emergency",
    "high priority",
];

const MEDIUM_PRIORITY_WORDS: &[&str] =
    &["update", "meeting", "review", "report", "analysis", "plan"];

/// Assesses importance on the counting scale over subject and body.
///
/// Each keyword counts once when present in either the subject or body;
/// two high hits make `High`, one high hit or two medium hits make
/// `Medium`.
#[must_use]
pub fn assess_priority(subject: &str, body: &str) -> Priority {
    let subject = subject.to_lowercase();
    let body = body.to_lowercase();

    let hits = |words: &[&str]| {
        words
            .iter()
            .filter(|w| subject.contains(*w) || body.contains(*w))
            .count()
    };

    let high = hits(HIGH_PRIORITY_WORDS);
    let medium = hits(MEDIUM_PRIORITY_WORDS);

    if high >= 2 {
        Priority::High
    } else if high >= 1 || medium >= 2 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Importance on the presence scale (per-message detail and heartbeat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No critical or high indicator present.
    Normal,
    /// A high indicator or any extracted alert snippet.
    High,
    /// Any critical indicator.
    Critical,
}

impl Severity {
    /// Stable label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// True for the severities that demand operator attention.
    #[must_use]
    pub const fn needs_attention(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

const CRITICAL_WORDS: &[&str] = &["critical", "urgent", "emergency", "p0", "outage"];
const HIGH_SEVERITY_WORDS: &[&str] = &["high", "important", "warning", "risk", "anomaly"];

/// Assesses importance on the presence scale.
///
/// A single critical keyword makes `Critical`; a high keyword or any
/// structured alert snippet makes `High`.
#[must_use]
pub fn assess_severity(subject: &str, text: &str, structured: &StructuredData) -> Severity {
    let haystack = format!("{} {}", subject.to_lowercase(), text.to_lowercase());

    if CRITICAL_WORDS.iter().any(|w| haystack.contains(w)) {
        return Severity::Critical;
    }
    if HIGH_SEVERITY_WORDS.iter().any(|w| haystack.contains(w)) || !structured.alerts.is_empty() {
        return Severity::High;
    }
    Severity::Normal
}

/// Routing category, independent of the message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Decision-bearing mail.
    Decisions,
    /// Status and progress mail.
    Updates,
    /// Alert mail.
    Alerts,
    /// Everything else.
    General,
}

impl Category {
    /// All categories, in the fixed reporting order.
    pub const ALL: [Self; 4] = [Self::Decisions, Self::Updates, Self::Alerts, Self::General];

    /// Stable label used in reports and the history log.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Decisions => "decisions",
            Self::Updates => "updates",
            Self::Alerts => "alerts",
            Self::General => "general",
        }
    }
}

const CATEGORY_RULES: &[KeywordRule<Category>] = &[
    KeywordRule {
        label: Category::Decisions,
        keywords: &[
            "decision", "decide", "approve", "approval", "budget", "strategy", "roadmap",
        ],
    },
    KeywordRule {
        label: Category::Alerts,
        keywords: &[
            "alert", "warning", "error", "failure", "urgent", "emergency", "critical",
        ],
    },
    KeywordRule {
        label: Category::Updates,
        keywords: &["update", "progress", "status", "report", "summary", "review"],
    },
];

/// Assigns the routing category over subject and body; decision keywords
/// are checked before alert keywords, alerts before updates.
#[must_use]
pub fn categorize(subject: &str, body: &str) -> Category {
    let haystack = format!("{} {}", subject.to_lowercase(), body.to_lowercase());
    first_match(CATEGORY_RULES, &haystack, Category::General)
}

/// Collects every classification keyword that matches this message, in
/// rule order without duplicates. Feeds the history log for the keyword
/// trend analysis.
#[must_use]
pub fn matched_keywords(subject: &str, body: &str) -> Vec<String> {
    let haystack = format!("{} {}", subject.to_lowercase(), body.to_lowercase());

    let mut keywords: Vec<String> = Vec::new();
    let sets = CATEGORY_RULES
        .iter()
        .map(|rule| rule.keywords)
        .chain([HIGH_PRIORITY_WORDS, MEDIUM_PRIORITY_WORDS]);

    for set in sets {
        for kw in set {
            if haystack.contains(kw) && !keywords.iter().any(|k| k == kw) {
                keywords.push((*kw).to_string());
            }
        }
    }

    keywords
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_type_first_match_wins() {
        assert_eq!(
            classify_type("Capacity alert for cluster"),
            MessageType::CapacityReport
        );
        assert_eq!(classify_type("Weekly inspection"), MessageType::InspectionReport);
        assert_eq!(classify_type("ALERT: disk full"), MessageType::Alert);
        assert_eq!(classify_type("Billing summary"), MessageType::CostReport);
        assert_eq!(classify_type("Security risk found"), MessageType::SecurityReport);
        assert_eq!(classify_type("hello there"), MessageType::General);
    }

    #[test]
    fn test_type_ignores_body() {
        // Type looks at the subject only
        assert_eq!(classify_type("FYI"), MessageType::General);
    }

    #[test]
    fn test_priority_counting_policy() {
        // Scenario: "urgent" and "budget" are two distinct high hits
        assert_eq!(
            assess_priority(
                "Urgent: Budget Decision Needed",
                "approve the budget increase"
            ),
            Priority::High
        );
        // One high hit
        assert_eq!(assess_priority("urgent thing", "nothing else"), Priority::Medium);
        // Two medium hits
        assert_eq!(
            assess_priority("status update", "weekly review attached"),
            Priority::Medium
        );
        assert_eq!(assess_priority("hello", "world"), Priority::Low);
    }

    #[test]
    fn test_priority_keyword_counts_once_across_subject_and_body() {
        // "urgent" in both subject and body is still a single hit
        assert_eq!(assess_priority("urgent", "urgent urgent"), Priority::Medium);
    }

    #[test]
    fn test_severity_presence_policy() {
        let empty = StructuredData::default();
        assert_eq!(
            assess_severity("P0 outage", "", &empty),
            Severity::Critical
        );
        assert_eq!(
            assess_severity("something important", "", &empty),
            Severity::High
        );
        assert_eq!(assess_severity("newsletter", "hi", &empty), Severity::Normal);
    }

    #[test]
    fn test_severity_alert_snippets_raise_to_high() {
        let structured = StructuredData {
            alerts: vec!["disk utilization above threshold".to_string()],
            ..StructuredData::default()
        };
        assert_eq!(assess_severity("newsletter", "hi", &structured), Severity::High);
    }

    #[test]
    fn test_category_order_decisions_before_alerts() {
        // "urgent" is an alert keyword, but decision keywords win
        assert_eq!(
            categorize("Urgent: Budget Decision Needed", "approve the increase"),
            Category::Decisions
        );
        assert_eq!(categorize("disk failure", ""), Category::Alerts);
        assert_eq!(categorize("progress report", ""), Category::Updates);
        assert_eq!(categorize("hello", "world"), Category::General);
    }

    #[test]
    fn test_matched_keywords_deduped_in_rule_order() {
        let keywords = matched_keywords("Budget decision", "review the budget plan");
        assert_eq!(keywords[0], "decision");
        assert!(keywords.contains(&"budget".to_string()));
        assert!(keywords.contains(&"review".to_string()));
        assert_eq!(
            keywords.iter().filter(|k| k.as_str() == "budget").count(),
            1
        );
    }
}
