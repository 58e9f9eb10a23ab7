//! Key-information extraction: summary, highlights, action items,
//! dashboard links, and decision info.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::MessageType;
use crate::content::ContentBundle;

/// Character budget for general summaries.
const SUMMARY_LEN: usize = 100;

/// Matches capped per action-item pattern.
const ACTIONS_PER_PATTERN: usize = 2;

/// Minimum cleaned length for an action item.
const MIN_ACTION_LEN: usize = 5;

/// Dashboard links surfaced per message.
const MAX_DASHBOARD_LINKS: usize = 3;

#[allow(clippy::unwrap_used)]
static ACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Politeness-prefixed requests
        r"(?i)please\s[^<>\n.!?]{10,100}",
        // Suggestions
        r"(?i)(?:suggest|recommend)\s[^<>\n.!?]{10,100}",
        // Obligations
        r"(?i)need to\s[^<>\n.!?]{10,100}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

#[allow(clippy::unwrap_used)]
static DECISION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)decision[^\n]*?(?:on|for|about)[^\n]*",
        r"(?i)approve[^\n]*",
        r"(?i)budget[^\n]*?(?:increase|decrease|adjust)",
        r"(?i)strategy[^\n]*?(?:change|update|modify)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

#[allow(clippy::unwrap_used)]
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").unwrap()
});

/// Key information derived from one classified message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Short, type-specific summary.
    pub summary: String,
    /// Up to three highlight strings.
    pub highlights: Vec<String>,
    /// Imperative phrases extracted from the body.
    pub action_items: Vec<String>,
    /// First few report links for quick access.
    pub dashboard_links: Vec<String>,
}

/// Extracts key information using type-specific summarization rules.
#[must_use]
pub fn extract_key_info(message_type: MessageType, content: &ContentBundle) -> KeyInfo {
    let structured = &content.structured;
    let mut info = KeyInfo::default();

    match message_type {
        MessageType::CapacityReport => {
            let arch = structured.architecture_id.as_deref().unwrap_or("unknown");
            let app = structured.app_id.as_deref().unwrap_or("unknown");
            info.summary = format!("Capacity monitoring report - architecture: {arch}, APPID: {app}");

            if !structured.metrics.is_empty() {
                let metrics: Vec<&str> = structured
                    .metrics
                    .iter()
                    .take(3)
                    .map(String::as_str)
                    .collect();
                info.highlights
                    .push(format!("Monitored metrics: {}", metrics.join(", ")));
            }
        }
        MessageType::InspectionReport => {
            info.summary = "Intelligent inspection report - automated model analysis".to_string();
            info.highlights
                .extend(structured.recommendations.iter().take(2).cloned());
        }
        MessageType::Alert => {
            info.summary = format!(
                "Alert notification - {} item(s) need attention",
                structured.alerts.len()
            );
            info.highlights
                .extend(structured.alerts.iter().take(3).cloned());
        }
        _ => {
            info.summary = first_sentence_summary(&content.text);
        }
    }

    info.action_items = extract_action_items(&content.text);
    info.dashboard_links = structured
        .report_links
        .iter()
        .take(MAX_DASHBOARD_LINKS)
        .cloned()
        .collect();

    info
}

/// First sentence of the text, truncated to the summary budget with an
/// ellipsis marker. Sentence boundaries cover ASCII and full-width
/// punctuation.
fn first_sentence_summary(text: &str) -> String {
    let first = text
        .split(['.', '!', '?', '。', '！', '？'])
        .next()
        .unwrap_or("")
        .trim();

    if first.chars().count() > SUMMARY_LEN {
        let cut: String = first.chars().take(SUMMARY_LEN).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

/// Scans the plain text for imperative phrases; at most two matches per
/// pattern, whitespace-normalized, short fragments filtered.
fn extract_action_items(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    for pattern in ACTION_PATTERNS.iter() {
        for m in pattern.find_iter(text).take(ACTIONS_PER_PATTERN) {
            let clean = WHITESPACE.replace_all(m.as_str(), " ").trim().to_string();
            if clean.len() > MIN_ACTION_LEN && !items.contains(&clean) {
                items.push(clean);
            }
        }
    }
    items
}

/// Decision extracted from a message, with its source context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionInfo {
    /// Subject of the message the decision came from.
    pub subject: String,
    /// The decision-shaped fragment.
    pub decision: String,
    /// Message timestamp (RFC 3339).
    pub date: String,
}

/// Returns true when the message carries a decision indicator.
#[must_use]
pub fn has_decision_indicator(subject: &str, body: &str) -> bool {
    subject.to_lowercase().contains("decision") || body.to_lowercase().contains("decide")
}

/// Scans the body for the first decision-shaped sentence fragment.
///
/// Returns `None` when no pattern matches, even if the indicator fired.
#[must_use]
pub fn extract_decision_info(
    subject: &str,
    body: &str,
    date: DateTime<Utc>,
) -> Option<DecisionInfo> {
    for pattern in DECISION_PATTERNS.iter() {
        if let Some(m) = pattern.find(body) {
            return Some(DecisionInfo {
                subject: subject.to_string(),
                decision: m.as_str().trim().to_string(),
                date: date.to_rfc3339(),
            });
        }
    }
    None
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
    use crate::content::StructuredData;
    use chrono::TimeZone;

    fn bundle_with(structured: StructuredData, text: &str) -> ContentBundle {
        ContentBundle {
            text: text.to_string(),
            structured,
            ..ContentBundle::default()
        }
    }

    #[test]
    fn test_capacity_summary_embeds_identifiers() {
        let structured = StructuredData {
            app_id: Some("12345".to_string()),
            architecture_id: Some("arch-a1b2".to_string()),
            metrics: vec!["CPU85%".to_string(), "memory12GB".to_string()],
            ..StructuredData::default()
        };
        let info = extract_key_info(MessageType::CapacityReport, &bundle_with(structured, ""));
        assert_eq!(
            info.summary,
            "Capacity monitoring report - architecture: arch-a1b2, APPID: 12345"
        );
        assert_eq!(
            info.highlights,
            vec!["Monitored metrics: CPU85%, memory12GB"]
        );
    }

    #[test]
    fn test_capacity_summary_placeholders() {
        let info = extract_key_info(
            MessageType::CapacityReport,
            &bundle_with(StructuredData::default(), ""),
        );
        assert_eq!(
            info.summary,
            "Capacity monitoring report - architecture: unknown, APPID: unknown"
        );
    }

    #[test]
    fn test_alert_summary_counts_snippets() {
        let structured = StructuredData {
            alerts: vec![
                "alert one with enough context".to_string(),
                "alert two with enough context".to_string(),
            ],
            ..StructuredData::default()
        };
        let info = extract_key_info(MessageType::Alert, &bundle_with(structured, ""));
        assert_eq!(info.summary, "Alert notification - 2 item(s) need attention");
        assert_eq!(info.highlights.len(), 2);
    }

    #[test]
    fn test_general_summary_first_sentence() {
        let info = extract_key_info(
            MessageType::General,
            &bundle_with(
                StructuredData::default(),
                "First sentence here. Second sentence ignored.",
            ),
        );
        assert_eq!(info.summary, "First sentence here");
    }

    #[test]
    fn test_general_summary_fullwidth_punctuation() {
        let info = extract_key_info(
            MessageType::General,
            &bundle_with(StructuredData::default(), "第一句。第二句。"),
        );
        assert_eq!(info.summary, "第一句");
    }

    #[test]
    fn test_general_summary_truncated_with_ellipsis() {
        let long = "a".repeat(150);
        let info = extract_key_info(
            MessageType::General,
            &bundle_with(StructuredData::default(), &long),
        );
        assert_eq!(info.summary.chars().count(), SUMMARY_LEN + 3);
        assert!(info.summary.ends_with("..."));
    }

    #[test]
    fn test_action_items_capped_per_pattern() {
        let text = "Please review the capacity dashboard today. \
                    Please check the billing anomalies report. \
                    Please confirm the maintenance window tonight. \
                    We recommend upgrading the instance family soon.";
        let items = extract_action_items(text);
        // Two "please" matches (third dropped), one recommendation
        assert_eq!(items.len(), 3);
        assert!(items[0].starts_with("Please review"));
        assert!(items[2].to_lowercase().starts_with("recommend"));
    }

    #[test]
    fn test_action_items_whitespace_normalized() {
        let items = extract_action_items("please   handle    the   disk alert promptly");
        assert_eq!(items, vec!["please handle the disk alert promptly"]);
    }

    #[test]
    fn test_dashboard_links_capped() {
        let structured = StructuredData {
            report_links: (0..5).map(|i| format!("https://d.example/{i}")).collect(),
            ..StructuredData::default()
        };
        let info = extract_key_info(MessageType::General, &bundle_with(structured, ""));
        assert_eq!(info.dashboard_links.len(), MAX_DASHBOARD_LINKS);
    }

    #[test]
    fn test_decision_indicator() {
        assert!(has_decision_indicator("Budget Decision Needed", ""));
        assert!(has_decision_indicator("FYI", "we will decide tomorrow"));
        assert!(!has_decision_indicator("status", "nothing here"));
    }

    #[test]
    fn test_decision_info_first_pattern_wins() {
        let date = Utc.with_ymd_and_hms(2026, 8, 8, 9, 0, 0).unwrap();
        let info = extract_decision_info(
            "Budget Decision",
            "The decision about scaling is final.\napprove the budget increase",
            date,
        )
        .unwrap();
        assert_eq!(info.decision, "decision about scaling is final.");
        assert_eq!(info.subject, "Budget Decision");
    }

    #[test]
    fn test_decision_info_none_without_pattern() {
        let date = Utc.with_ymd_and_hms(2026, 8, 8, 9, 0, 0).unwrap();
        assert!(extract_decision_info("Decision", "nothing shaped like one", date).is_none());
    }
}
