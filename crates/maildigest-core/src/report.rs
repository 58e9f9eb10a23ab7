//! Digest rendering: markdown and structured output.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{DailyAggregate, DataPointKind};
use crate::attachment::{AttachmentSummary, render_attachment_summaries};
use crate::classify::{MessageType, Severity};
use crate::history::HistoryComparison;
use crate::message::AnalyzedMessage;
use crate::trends::{TrendAnalysis, generate_insights};

/// Data points shown in the digest.
const MAX_DATA_POINTS: usize = 5;

/// Highlights shown in the digest.
const MAX_HIGHLIGHTS: usize = 5;

/// Action items shown in the digest.
const MAX_ACTION_ITEMS: usize = 3;

/// A message that demands operator attention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionItem {
    /// Message subject.
    pub subject: String,
    /// Derived type.
    pub message_type: MessageType,
    /// Severity that triggered the attention flag.
    pub severity: Severity,
    /// Short reason, from the key-info summary.
    pub reason: String,
}

/// Per-message detail for the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDetail {
    /// Message subject.
    pub subject: String,
    /// Derived type.
    pub message_type: MessageType,
    /// Severity on the presence scale.
    pub severity: Severity,
    /// Key-info summary.
    pub summary: String,
    /// Message timestamp (RFC 3339).
    pub time: String,
    /// Original names of persisted attachments.
    pub attachments: Vec<String>,
    /// Dashboard links.
    pub links: Vec<String>,
}

/// The full result of one run, renderable as markdown or JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// "success" or "`no_emails`".
    pub status: String,
    /// Generation timestamp (RFC 3339).
    pub generated_at: String,
    /// Reporting window in hours.
    pub period_hours: u32,
    /// The folded daily aggregate.
    pub aggregate: DailyAggregate,
    /// Day-over-day comparison.
    pub comparison: HistoryComparison,
    /// Message counts per derived type.
    pub by_type: BTreeMap<MessageType, usize>,
    /// Critical/high-severity messages.
    pub attention_required: Vec<AttentionItem>,
    /// Collected highlights across messages.
    pub highlights: Vec<String>,
    /// Collected action items across messages.
    pub action_items: Vec<String>,
    /// Per-message details.
    pub details: Vec<MessageDetail>,
    /// Attachment decoder summaries.
    pub attachment_summaries: Vec<AttachmentSummary>,
}

impl RunReport {
    /// Assembles the run report from analyzed messages and the aggregate.
    #[must_use]
    pub fn build(
        messages: &[AnalyzedMessage],
        aggregate: DailyAggregate,
        comparison: HistoryComparison,
        period_hours: u32,
        generated_at: DateTime<Utc>,
        attachment_summaries: Vec<AttachmentSummary>,
    ) -> Self {
        let mut by_type: BTreeMap<MessageType, usize> = BTreeMap::new();
        let mut attention_required = Vec::new();
        let mut highlights = Vec::new();
        let mut action_items = Vec::new();
        let mut details = Vec::new();

        for message in messages {
            *by_type.entry(message.message_type).or_default() += 1;

            if message.severity.needs_attention() {
                attention_required.push(AttentionItem {
                    subject: message.subject.clone(),
                    message_type: message.message_type,
                    severity: message.severity,
                    reason: message.key_info.summary.clone(),
                });
            }

            highlights.extend(message.key_info.highlights.iter().cloned());
            action_items.extend(message.key_info.action_items.iter().cloned());

            details.push(MessageDetail {
                subject: message.subject.clone(),
                message_type: message.message_type,
                severity: message.severity,
                summary: message.key_info.summary.clone(),
                time: message.date.to_rfc3339(),
                attachments: message
                    .content
                    .attachments
                    .iter()
                    .map(|a| a.original_name.clone())
                    .collect(),
                links: message.key_info.dashboard_links.clone(),
            });
        }

        Self {
            status: if messages.is_empty() {
                "no_emails".to_string()
            } else {
                "success".to_string()
            },
            generated_at: generated_at.to_rfc3339(),
            period_hours,
            aggregate,
            comparison,
            by_type,
            attention_required,
            highlights,
            action_items,
            details,
            attachment_summaries,
        }
    }

    /// Serializes the report as pretty JSON for structured output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Renders the daily digest as markdown.
#[must_use]
pub fn render_digest(report: &RunReport, date: DateTime<Utc>) -> String {
    let date_label = date.format("%Y-%m-%d");

    if report.status == "no_emails" {
        return format!(
            "# Email Daily Digest - {date_label}\n\n\
             No emails from the monitored sender in this period.\n"
        );
    }

    let aggregate = &report.aggregate;
    let mut md = format!("# Email Daily Digest - {date_label}\n\n## Executive Summary\n");

    let _ = write!(md, "- New emails: {}", aggregate.total_emails);
    let delta = report.comparison.email_count_change;
    if delta != 0 {
        let arrow = if delta > 0 { "up" } else { "down" };
        let _ = write!(md, " ({arrow} {} vs previous run)", delta.abs());
    }
    md.push('\n');
    let _ = writeln!(md, "- Important emails: {}", aggregate.by_importance.high);
    let _ = writeln!(md, "- Urgent items: {}", aggregate.urgent_items.len());

    md.push_str("\n## Importance Breakdown\n");
    let _ = writeln!(md, "- High: {}", aggregate.by_importance.high);
    let _ = writeln!(md, "- Medium: {}", aggregate.by_importance.medium);
    let _ = writeln!(md, "- Low: {}", aggregate.by_importance.low);

    md.push_str("\n## Type Statistics\n");
    for (message_type, count) in &report.by_type {
        let _ = writeln!(md, "- {}: {count}", message_type.display_name());
    }

    if !report.attention_required.is_empty() {
        md.push_str("\n## Attention Required\n");
        for item in &report.attention_required {
            let _ = writeln!(
                md,
                "- **{}** [{}] - {}",
                item.subject,
                item.severity.label(),
                item.reason
            );
        }
    }

    md.push_str("\n## Key Decisions\n");
    if aggregate.key_decisions.is_empty() {
        md.push_str("No explicit decision emails in this period.\n");
    } else {
        for (i, decision) in aggregate.key_decisions.iter().enumerate() {
            let _ = writeln!(
                md,
                "{}. **{}** - {}",
                i + 1,
                decision.subject,
                truncate(&decision.decision, 100)
            );
        }
    }

    md.push_str("\n## Urgent Items\n");
    if aggregate.urgent_items.is_empty() {
        md.push_str("No urgent items in this period.\n");
    } else {
        for item in &aggregate.urgent_items {
            let _ = writeln!(md, "- **{}** - {}", item.subject, truncate(&item.summary, 150));
        }
    }

    md.push_str("\n## Category Statistics\n");
    let _ = writeln!(md, "- Decisions: {}", aggregate.by_category.decisions);
    let _ = writeln!(md, "- Updates: {}", aggregate.by_category.updates);
    let _ = writeln!(md, "- Alerts: {}", aggregate.by_category.alerts);
    let _ = writeln!(md, "- General: {}", aggregate.by_category.general);

    md.push_str("\n## Data Highlights\n");
    if aggregate.data_points.is_empty() {
        md.push_str("No significant data points found.\n");
    } else {
        for (i, point) in aggregate.data_points.iter().take(MAX_DATA_POINTS).enumerate() {
            let kind = match point.kind {
                DataPointKind::Percentage => "percentage",
                DataPointKind::Number => "number",
            };
            let _ = writeln!(
                md,
                "{}. {} ({kind}) - {}",
                i + 1,
                point.value,
                truncate(&point.context, 80)
            );
        }
    }

    if !report.highlights.is_empty() {
        md.push_str("\n## Highlights\n");
        for highlight in report.highlights.iter().take(MAX_HIGHLIGHTS) {
            let _ = writeln!(md, "- {highlight}");
        }
    }

    if !report.action_items.is_empty() {
        md.push_str("\n## Suggested Operations\n");
        for action in report.action_items.iter().take(MAX_ACTION_ITEMS) {
            let _ = writeln!(md, "- {action}");
        }
    }

    md.push_str("\n## Action Recommendations\n");
    let recommendations = action_recommendations(report);
    if recommendations.is_empty() {
        md.push_str("Emails are routine today, process normally.\n");
    } else {
        for (i, rec) in recommendations.iter().enumerate() {
            let _ = writeln!(md, "{}. {rec}", i + 1);
        }
    }

    md.push_str("\n## Details\n");
    for detail in &report.details {
        let _ = writeln!(md, "\n### {}", detail.subject);
        let _ = writeln!(md, "- **Type**: {}", detail.message_type.display_name());
        let _ = writeln!(md, "- **Severity**: {}", detail.severity.label());
        let _ = writeln!(md, "- **Summary**: {}", detail.summary);
        if !detail.attachments.is_empty() {
            let _ = writeln!(md, "- **Attachments**: {}", detail.attachments.join(", "));
        }
        if let Some(link) = detail.links.first() {
            let _ = writeln!(md, "- **Dashboard**: [open]({link})");
        }
    }

    let attachments_md = render_attachment_summaries(&report.attachment_summaries);
    if !attachments_md.is_empty() {
        md.push('\n');
        md.push_str(&attachments_md);
    }

    let _ = write!(
        md,
        "\n---\n*Generated at {} | Period: last {} hours*\n",
        date.format("%H:%M"),
        report.period_hours
    );

    md
}

/// Threshold-driven recommendations for the digest footer.
fn action_recommendations(report: &RunReport) -> Vec<String> {
    let aggregate = &report.aggregate;
    let mut recommendations = Vec::new();

    if aggregate.by_importance.high > 0 {
        recommendations.push("**High Priority**: Address high-importance emails".to_string());
    }
    if !aggregate.key_decisions.is_empty() {
        recommendations.push("**Follow-up**: Monitor decision items from emails".to_string());
    }
    if !aggregate.urgent_items.is_empty() {
        recommendations.push("**Urgent**: Prioritize urgent email items".to_string());
    }
    if report.comparison.email_count_change > 5 {
        recommendations.push(
            "**Volume Spike**: Email volume significantly increased, optimize email management"
                .to_string(),
        );
    }

    recommendations
}

/// Renders the failure digest for a run-level error.
#[must_use]
pub fn render_failure_digest(error: &str, date: DateTime<Utc>) -> String {
    format!(
        "# Email Daily Digest - {}\n\n\
         ## Generation Failed\n\n\
         Error: {error}\n\n\
         Please check the mailbox configuration and network connection.\n",
        date.format("%Y-%m-%d")
    )
}

/// Renders the weekly trend report as markdown.
#[must_use]
pub fn render_trend_report(analysis: &TrendAnalysis, date: DateTime<Utc>) -> String {
    let mut md = format!(
        "# Weekly Trend Analysis - {}\n\n## Email Volume Trend\n",
        date.format("%Y-%m-%d")
    );

    if let Some(volume) = &analysis.volume {
        let _ = writeln!(md, "- Trend: {}", volume.trend.label());
        let _ = writeln!(md, "- Change rate: {:.1}%", volume.change_rate);
        let recent: Vec<String> = volume
            .recent_volumes
            .iter()
            .rev()
            .take(3)
            .rev()
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(md, "- Recent volumes: {}", recent.join(", "));
    } else {
        md.push_str("- Insufficient history for a volume trend\n");
    }

    md.push_str("\n## Keyword Trends\n");
    if analysis.keywords.is_empty() {
        md.push_str("- Keyword trends are stable this week\n");
    } else {
        for trend in analysis.keywords.iter().take(5) {
            let kind = match trend.trend {
                crate::trends::KeywordTrendKind::Emerging => "emerging",
                crate::trends::KeywordTrendKind::Declining => "declining",
            };
            let _ = writeln!(
                md,
                "- **{}**: {kind} (recent: {}, previous: {})",
                trend.keyword, trend.recent_count, trend.previous_count
            );
        }
    }

    md.push_str("\n## Importance Trend\n");
    if let Some(importance) = &analysis.importance {
        let _ = writeln!(md, "- Trend: {}", importance.trend.label());
        let _ = writeln!(md, "- Current ratio: {:.1}%", importance.latest_ratio);
        let _ = writeln!(md, "- Average ratio: {:.1}%", importance.average_ratio);
    } else {
        md.push_str("- Insufficient history for an importance trend\n");
    }

    md.push_str("\n## Category Trends\n");
    if analysis.categories.is_empty() {
        md.push_str("- Insufficient history for category trends\n");
    } else {
        for (category, trend) in &analysis.categories {
            let _ = writeln!(
                md,
                "- **{}**: {} (current: {}, avg: {:.1})",
                category.label(),
                trend.trend.label(),
                trend.latest_count,
                trend.previous_average
            );
        }
    }

    let insights = generate_insights(analysis);
    if !insights.is_empty() {
        md.push_str("\n## Trend Insights\n");
        for insight in &insights {
            let _ = writeln!(md, "- {insight}");
        }
    }

    md.push_str("\n---\n*Report generated by maildigest*\n");
    md
}

fn truncate(text: &str, limit: usize) -> String {
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
    use crate::aggregate::aggregate_daily;
    use crate::history::compare_with_history;
    use crate::message::analyze_message;
    use crate::trends::{DEFAULT_TREND_WINDOW, analyze_trends};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join("maildigest-report-tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, 9, 0, 0).unwrap()
    }

    fn message(subject: &str, body: &str) -> AnalyzedMessage {
        let raw = format!("Subject: {subject}\r\nContent-Type: text/plain\r\n\r\n{body}");
        analyze_message(raw.as_bytes(), "1", &temp_dir(), now()).unwrap()
    }

    fn build_report(messages: &[AnalyzedMessage]) -> RunReport {
        let aggregate = aggregate_daily(messages, now().date_naive());
        let comparison = compare_with_history(&[], &aggregate);
        RunReport::build(messages, aggregate, comparison, 24, now(), Vec::new())
    }

    #[test]
    fn test_empty_run_digest() {
        let report = build_report(&[]);
        assert_eq!(report.status, "no_emails");
        let md = render_digest(&report, now());
        assert!(md.contains("No emails from the monitored sender"));
    }

    #[test]
    fn test_digest_sections_present() {
        let messages = vec![
            message("Urgent: Budget Decision Needed", "approve the budget increase"),
            message("status update", "cpu at 87.5% of capacity today"),
        ];
        let report = build_report(&messages);
        let md = render_digest(&report, now());

        assert!(md.contains("# Email Daily Digest - 2026-08-08"));
        assert!(md.contains("- New emails: 2"));
        assert!(md.contains("## Importance Breakdown"));
        assert!(md.contains("## Key Decisions"));
        assert!(md.contains("## Urgent Items"));
        assert!(md.contains("## Category Statistics"));
        assert!(md.contains("- Decisions: 1"));
        assert!(md.contains("87.5"));
        assert!(md.contains("**High Priority**"));
        assert!(md.contains("### Urgent: Budget Decision Needed"));
    }

    #[test]
    fn test_digest_routine_recommendation() {
        let messages = vec![message("hello", "nothing to see")];
        let report = build_report(&messages);
        let md = render_digest(&report, now());
        assert!(md.contains("Emails are routine today"));
    }

    #[test]
    fn test_failure_digest() {
        let md = render_failure_digest("Authentication failed: bad credentials", now());
        assert!(md.contains("Generation Failed"));
        assert!(md.contains("Authentication failed: bad credentials"));
    }

    #[test]
    fn test_structured_output_round_trips() {
        let messages = vec![message("status update", "cpu at 90%")];
        let report = build_report(&messages);
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["aggregate"]["total_emails"], 1);
    }

    #[test]
    fn test_trend_report_insufficient_history() {
        let analysis = analyze_trends(&[], DEFAULT_TREND_WINDOW);
        let md = render_trend_report(&analysis, now());
        assert!(md.contains("Insufficient history for a volume trend"));
        assert!(md.contains("Keyword trends are stable"));
    }

    #[test]
    fn test_trend_report_with_history() {
        let a = crate::aggregate::DailyAggregate {
            total_emails: 10,
            ..crate::aggregate::DailyAggregate::default()
        };
        let b = crate::aggregate::DailyAggregate {
            total_emails: 15,
            ..crate::aggregate::DailyAggregate::default()
        };

        let analysis = analyze_trends(&[a, b], DEFAULT_TREND_WINDOW);
        let md = render_trend_report(&analysis, now());
        assert!(md.contains("significantly_increasing"));
        assert!(md.contains("Change rate: 50.0%"));
        assert!(md.contains("+50.0%"));
    }
}
