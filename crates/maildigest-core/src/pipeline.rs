//! Run orchestration: fetch, analyze, aggregate, persist, render.
//!
//! Messages are processed strictly one at a time; the only shared state
//! across runs is the history log, read once at the start of the
//! comparison step and appended once at the end.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::aggregate_daily;
use crate::attachment::{AttachmentDecoder, AttachmentSummary, BasicDecoder};
use crate::classify::{MessageType, Severity};
use crate::config::Settings;
use crate::error::Result;
use crate::history::{HistoryStore, compare_with_history};
use crate::message::{AnalyzedMessage, analyze_message};
use crate::report::{RunReport, render_digest, render_trend_report};
use crate::service::{RawMessage, fetch_messages};
use crate::trends::{DEFAULT_TREND_WINDOW, analyze_trends};

/// Reporting window used by the heartbeat scan, in hours.
const HEARTBEAT_HOURS: u32 = 1;

/// Output flavor of the daily run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable markdown digest.
    Markdown,
    /// Full run report as JSON.
    Structured,
}

/// Parses and derives each raw message, one at a time.
///
/// A message that fails to parse is logged and skipped; it never aborts
/// the batch.
#[must_use]
pub fn analyze_batch(
    raws: &[RawMessage],
    attachments_dir: &Path,
    fetched_at: DateTime<Utc>,
) -> Vec<AnalyzedMessage> {
    raws.iter()
        .filter_map(|raw| {
            match analyze_message(&raw.bytes, &raw.uid.to_string(), attachments_dir, fetched_at) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(uid = raw.uid, error = %e, "failed to parse message, skipping");
                    None
                }
            }
        })
        .collect()
}

/// Runs the attachment decoder over every persisted attachment.
#[must_use]
pub fn decode_attachments(
    messages: &[AnalyzedMessage],
    decoder: &dyn AttachmentDecoder,
) -> Vec<AttachmentSummary> {
    messages
        .iter()
        .flat_map(|m| m.content.attachments.iter())
        .map(|descriptor| decoder.decode(descriptor))
        .collect()
}

/// Runs the full daily digest pipeline and returns the rendered output.
///
/// # Errors
///
/// Returns an error for connection/authentication failures and for
/// structured-output serialization failures; the binary converts these
/// into a failure digest. Everything below the transport degrades
/// per-message instead of failing the run.
pub async fn run_daily(settings: &Settings, format: OutputFormat) -> Result<String> {
    let now = Utc::now();
    info!(hours = settings.hours, sender = %settings.sender, "starting daily digest run");

    let since = (now - Duration::hours(i64::from(settings.hours))).date_naive();
    let raws = fetch_messages(settings, &settings.sender, since).await?;
    let messages = analyze_batch(&raws, &settings.attachments_dir(), now);
    info!(parsed = messages.len(), fetched = raws.len(), "messages analyzed");

    let aggregate = aggregate_daily(&messages, now.date_naive());

    let store = HistoryStore::new(settings.history_file());
    let history = store.load();
    let comparison = compare_with_history(&history, &aggregate);

    let summaries = decode_attachments(&messages, &BasicDecoder);
    let report = RunReport::build(
        &messages,
        aggregate.clone(),
        comparison,
        settings.hours,
        now,
        summaries,
    );

    // An empty run renders a digest but is not recorded as a history day
    if messages.is_empty() {
        info!("no matching messages found");
    } else if let Err(e) = store.append(&aggregate) {
        warn!(error = %e, "failed to persist history; report unaffected");
    }

    match format {
        OutputFormat::Markdown => Ok(render_digest(&report, now)),
        OutputFormat::Structured => report.to_json(),
    }
}

/// Renders the weekly trend report from the persisted history.
#[must_use]
pub fn run_trends(settings: &Settings) -> String {
    let store = HistoryStore::new(settings.history_file());
    let history = store.load();
    let analysis = analyze_trends(&history, DEFAULT_TREND_WINDOW);
    render_trend_report(&analysis, Utc::now())
}

/// One item of a heartbeat alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatItem {
    /// Message subject.
    pub subject: String,
    /// Derived type.
    pub message_type: MessageType,
    /// Severity that triggered the alert.
    pub severity: Severity,
    /// Key-info summary.
    pub summary: String,
    /// Message timestamp (RFC 3339).
    pub time: String,
}

/// Notification produced when the heartbeat scan finds important mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatAlert {
    /// Scan timestamp (RFC 3339).
    pub timestamp: String,
    /// One-line summary of what was found.
    pub summary: String,
    /// Number of critical-severity messages.
    pub critical_count: usize,
    /// Number of high-severity messages.
    pub high_count: usize,
    /// The triggering messages, critical first.
    pub items: Vec<HeartbeatItem>,
}

/// Scans analyzed messages for critical/high severity items.
///
/// Returns `None` when nothing needs attention.
#[must_use]
pub fn heartbeat_scan(messages: &[AnalyzedMessage], now: DateTime<Utc>) -> Option<HeartbeatAlert> {
    let critical: Vec<&AnalyzedMessage> = messages
        .iter()
        .filter(|m| m.severity == Severity::Critical)
        .collect();
    let high: Vec<&AnalyzedMessage> = messages
        .iter()
        .filter(|m| m.severity == Severity::High)
        .collect();

    if critical.is_empty() && high.is_empty() {
        return None;
    }

    let items = critical
        .iter()
        .chain(high.iter())
        .map(|m| HeartbeatItem {
            subject: m.subject.clone(),
            message_type: m.message_type,
            severity: m.severity,
            summary: m.key_info.summary.clone(),
            time: m.date.to_rfc3339(),
        })
        .collect();

    Some(HeartbeatAlert {
        timestamp: now.to_rfc3339(),
        summary: format!(
            "Detected {} critical, {} high importance item(s)",
            critical.len(),
            high.len()
        ),
        critical_count: critical.len(),
        high_count: high.len(),
        items,
    })
}

/// Runs the one-hour heartbeat check against the mailbox.
///
/// # Errors
///
/// Returns an error for connection/authentication failures.
pub async fn run_heartbeat(settings: &Settings) -> Result<Option<HeartbeatAlert>> {
    let now = Utc::now();
    let since = (now - Duration::hours(i64::from(HEARTBEAT_HOURS))).date_naive();

    let raws = fetch_messages(settings, &settings.sender, since).await?;
    let messages = analyze_batch(&raws, &settings.attachments_dir(), now);

    Ok(heartbeat_scan(&messages, now))
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
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join("maildigest-pipeline-tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, 9, 0, 0).unwrap()
    }

    fn raw(uid: u32, subject: &str, body: &str) -> RawMessage {
        RawMessage {
            uid,
            bytes: format!("Subject: {subject}\r\nContent-Type: text/plain\r\n\r\n{body}")
                .into_bytes(),
        }
    }

    #[test]
    fn test_analyze_batch_processes_in_order() {
        let raws = vec![raw(3, "first", "a"), raw(1, "second", "b")];
        let messages = analyze_batch(&raws, &temp_dir(), now());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].subject, "first");
        assert_eq!(messages[0].id, "3");
        assert_eq!(messages[1].subject, "second");
    }

    #[test]
    fn test_heartbeat_none_when_routine() {
        let raws = vec![raw(1, "newsletter", "nothing of note")];
        let messages = analyze_batch(&raws, &temp_dir(), now());
        assert!(heartbeat_scan(&messages, now()).is_none());
    }

    #[test]
    fn test_heartbeat_alert_counts_and_order() {
        let raws = vec![
            raw(1, "something important", "high signal"),
            raw(2, "P0 outage in progress", "urgent"),
        ];
        let messages = analyze_batch(&raws, &temp_dir(), now());
        let alert = heartbeat_scan(&messages, now()).unwrap();

        assert_eq!(alert.critical_count, 1);
        assert_eq!(alert.high_count, 1);
        // Critical items lead the list
        assert_eq!(alert.items[0].severity, Severity::Critical);
        assert_eq!(alert.items[0].subject, "P0 outage in progress");
        assert!(alert.summary.contains("1 critical, 1 high"));
    }

    #[test]
    fn test_heartbeat_serializes() {
        let raws = vec![raw(2, "P0 outage", "down")];
        let messages = analyze_batch(&raws, &temp_dir(), now());
        let alert = heartbeat_scan(&messages, now()).unwrap();
        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"critical_count\":1"));
    }
}
