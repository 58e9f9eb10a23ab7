//! Daily aggregation: fold a batch of analyzed messages into one record.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::{Category, Priority};
use crate::keyinfo::{DecisionInfo, extract_decision_info, has_decision_indicator};
use crate::message::AnalyzedMessage;

/// Character radius of the context window around a data point.
const CONTEXT_RADIUS: usize = 50;

/// Character budget for an urgent item's summary.
const URGENT_SUMMARY_LEN: usize = 200;

#[allow(clippy::unwrap_used)]
static PERCENTAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)%").unwrap()
});

#[allow(clippy::unwrap_used)]
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+(?:,\d{3})*(?:\.\d+)?)\b").unwrap()
});

/// Message counts by importance level (counting scale).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportanceCounts {
    /// High-priority messages.
    pub high: usize,
    /// Medium-priority messages.
    pub medium: usize,
    /// Low-priority messages.
    pub low: usize,
}

impl ImportanceCounts {
    /// Increments the counter for one priority.
    pub const fn increment(&mut self, priority: Priority) {
        match priority {
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }

    /// Sum over all levels.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Message counts by routing category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    /// Decision-bearing messages.
    pub decisions: usize,
    /// Status/progress messages.
    pub updates: usize,
    /// Alert messages.
    pub alerts: usize,
    /// Everything else.
    pub general: usize,
}

impl CategoryCounts {
    /// Increments the counter for one category.
    pub const fn increment(&mut self, category: Category) {
        match category {
            Category::Decisions => self.decisions += 1,
            Category::Updates => self.updates += 1,
            Category::Alerts => self.alerts += 1,
            Category::General => self.general += 1,
        }
    }

    /// Count for one category.
    #[must_use]
    pub const fn get(&self, category: Category) -> usize {
        match category {
            Category::Decisions => self.decisions,
            Category::Updates => self.updates,
            Category::Alerts => self.alerts,
            Category::General => self.general,
        }
    }

    /// Sum over all categories.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.decisions + self.updates + self.alerts + self.general
    }
}

/// Kind of an extracted data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataPointKind {
    /// A percentage-formatted number.
    Percentage,
    /// A free-standing large number.
    Number,
}

/// One numeric data point with its textual context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Data point kind.
    pub kind: DataPointKind,
    /// Numeric value.
    pub value: f64,
    /// Context window around the first occurrence of the token.
    pub context: String,
}

/// An urgent item surfaced from a high-priority message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgentItem {
    /// Message subject.
    pub subject: String,
    /// Truncated body summary.
    pub summary: String,
}

/// One run's statistics; immutable once persisted to the history log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// ISO date of the run.
    pub date: String,
    /// Total messages folded in.
    pub total_emails: usize,
    /// Counts by importance; sums to `total_emails`.
    pub by_importance: ImportanceCounts,
    /// Counts by category; sums to `total_emails`.
    pub by_category: CategoryCounts,
    /// Decisions extracted from decision-bearing messages.
    pub key_decisions: Vec<DecisionInfo>,
    /// Urgent items from high-priority messages.
    pub urgent_items: Vec<UrgentItem>,
    /// Numeric data points with context.
    pub data_points: Vec<DataPoint>,
    /// Classification keywords seen this run, for the keyword trend.
    pub keywords: Vec<String>,
}

/// Folds a batch of analyzed messages into one daily aggregate.
///
/// Invariant: both count maps sum to `total_emails`; every message
/// increments exactly one importance and one category counter.
#[must_use]
pub fn aggregate_daily(messages: &[AnalyzedMessage], date: NaiveDate) -> DailyAggregate {
    let mut aggregate = DailyAggregate {
        date: date.format("%Y-%m-%d").to_string(),
        total_emails: messages.len(),
        ..DailyAggregate::default()
    };

    for message in messages {
        aggregate.by_importance.increment(message.priority);
        aggregate.by_category.increment(message.category);

        if message.priority == Priority::High {
            aggregate.urgent_items.push(UrgentItem {
                subject: message.subject.clone(),
                summary: truncate_chars(&message.content.text, URGENT_SUMMARY_LEN),
            });
        }

        if has_decision_indicator(&message.subject, &message.content.text) {
            if let Some(decision) =
                extract_decision_info(&message.subject, &message.content.text, message.date)
            {
                aggregate.key_decisions.push(decision);
            }
        }

        aggregate
            .data_points
            .extend(extract_data_points(&message.content.text));

        for keyword in &message.keywords {
            if !aggregate.keywords.iter().any(|k| k == keyword) {
                aggregate.keywords.push(keyword.clone());
            }
        }
    }

    aggregate
}

/// Extracts percentage and large-number data points from plain text.
///
/// Percentages match any `N%` token. Free-standing numbers qualify when
/// the token is longer than 3 digits, has no leading zero, and the value
/// exceeds 100.
#[must_use]
pub fn extract_data_points(text: &str) -> Vec<DataPoint> {
    let mut points = Vec::new();

    for caps in PERCENTAGE.captures_iter(text) {
        if let Ok(value) = caps[1].parse::<f64>() {
            let token = format!("{}%", &caps[1]);
            points.push(DataPoint {
                kind: DataPointKind::Percentage,
                value,
                context: find_context(text, &token),
            });
        }
    }

    for caps in NUMBER.captures_iter(text) {
        let token = &caps[1];
        if token.len() <= 3 || token.starts_with('0') {
            continue;
        }
        let Ok(value) = token.replace(',', "").parse::<f64>() else {
            continue;
        };
        if value > 100.0 {
            points.push(DataPoint {
                kind: DataPointKind::Number,
                value,
                context: find_context(text, token),
            });
        }
    }

    points
}

/// Context window around the first occurrence of `target`.
fn find_context(text: &str, target: &str) -> String {
    let Some(at) = text.find(target) else {
        return String::new();
    };

    let start = text[..at]
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS - 1)
        .map_or(0, |(i, _)| i);

    let after = at + target.len();
    let end = text[after..]
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map_or(text.len(), |(i, _)| after + i);

    text[start..end].trim().to_string()
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
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
    use crate::message::analyze_message;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join("maildigest-aggregate-tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn message(subject: &str, body: &str) -> AnalyzedMessage {
        let raw = format!("Subject: {subject}\r\nContent-Type: text/plain\r\n\r\n{body}");
        analyze_message(
            raw.as_bytes(),
            "1",
            &temp_dir(),
            Utc.with_ymd_and_hms(2026, 8, 8, 9, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 8).unwrap()
    }

    #[test]
    fn test_count_invariants() {
        let messages = vec![
            message("Urgent: Budget Decision Needed", "approve the budget increase"),
            message("status update", "weekly review progress"),
            message("hello", "nothing special"),
        ];

        let aggregate = aggregate_daily(&messages, run_date());

        assert_eq!(aggregate.total_emails, 3);
        assert_eq!(aggregate.by_importance.total(), aggregate.total_emails);
        assert_eq!(aggregate.by_category.total(), aggregate.total_emails);
    }

    #[test]
    fn test_urgent_items_from_high_priority() {
        let messages = vec![message(
            "Urgent: Budget Decision Needed",
            "approve the budget increase",
        )];
        let aggregate = aggregate_daily(&messages, run_date());

        assert_eq!(aggregate.by_importance.high, 1);
        assert_eq!(aggregate.urgent_items.len(), 1);
        assert_eq!(
            aggregate.urgent_items[0].summary,
            "approve the budget increase"
        );
    }

    #[test]
    fn test_urgent_summary_truncated() {
        let long_body = format!("urgent emergency {}", "x".repeat(300));
        let messages = vec![message("something", &long_body)];
        let aggregate = aggregate_daily(&messages, run_date());

        assert_eq!(aggregate.urgent_items.len(), 1);
        let summary = &aggregate.urgent_items[0].summary;
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), URGENT_SUMMARY_LEN + 3);
    }

    #[test]
    fn test_decisions_collected() {
        let messages = vec![message(
            "Budget Decision",
            "We will approve the budget increase next week",
        )];
        let aggregate = aggregate_daily(&messages, run_date());

        assert_eq!(aggregate.key_decisions.len(), 1);
        assert!(aggregate.key_decisions[0].decision.starts_with("approve"));
    }

    #[test]
    fn test_data_points_percentage() {
        let points = extract_data_points("CPU usage reached 87.5% during the peak");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].kind, DataPointKind::Percentage);
        assert!((points[0].value - 87.5).abs() < f64::EPSILON);
        assert!(points[0].context.contains("87.5%"));
    }

    #[test]
    fn test_data_points_large_number() {
        let points = extract_data_points("The cluster served 12,500 requests");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].kind, DataPointKind::Number);
        assert!((points[0].value - 12500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_data_points_filters() {
        // Short token, leading zero, and small value are all rejected
        assert!(extract_data_points("rooms 101 and 099 and 42").is_empty());
    }

    #[test]
    fn test_context_window_radius() {
        let text = format!("{}TARGET 5000 HERE{}", "a".repeat(100), "b".repeat(100));
        let points = extract_data_points(&text);
        assert_eq!(points.len(), 1);
        let context = &points[0].context;
        assert!(context.contains("5000"));
        // 50 chars either side plus the token itself
        assert!(context.chars().count() <= CONTEXT_RADIUS * 2 + 4);
    }

    #[test]
    fn test_context_taken_from_first_occurrence() {
        let text = format!(
            "first mention 5000 here {} second mention 5000 there",
            "pad ".repeat(30)
        );
        let points = extract_data_points(&text);
        assert_eq!(points.len(), 2);
        assert!(points[0].context.contains("first mention"));
        assert!(points[1].context.contains("first mention"));
    }

    #[test]
    fn test_keywords_deduped_across_messages() {
        let messages = vec![
            message("budget report", "the budget again"),
            message("budget status", "more budget talk"),
        ];
        let aggregate = aggregate_daily(&messages, run_date());
        assert_eq!(
            aggregate
                .keywords
                .iter()
                .filter(|k| k.as_str() == "budget")
                .count(),
            1
        );
    }

    #[test]
    fn test_empty_batch() {
        let aggregate = aggregate_daily(&[], run_date());
        assert_eq!(aggregate.total_emails, 0);
        assert_eq!(aggregate.by_importance.total(), 0);
        assert_eq!(aggregate.by_category.total(), 0);
        assert_eq!(aggregate.date, "2026-08-08");
    }
}
