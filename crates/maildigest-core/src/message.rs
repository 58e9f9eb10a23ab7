//! The analyzed message: one mail item with all derived fields.

use std::path::Path;

use chrono::{DateTime, Utc};
use maildigest_mime::Message;
use serde::{Deserialize, Serialize};

use crate::classify::{
    Category, MessageType, Priority, Severity, assess_priority, assess_severity, categorize,
    classify_type, matched_keywords,
};
use crate::content::{ContentBundle, extract_content};
use crate::error::Result;
use crate::keyinfo::{KeyInfo, extract_key_info};

/// One fully-derived mail item.
///
/// Created per fetch, derived synchronously, and discarded after being
/// folded into the daily aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedMessage {
    /// Mailbox-assigned id, unique within a run.
    pub id: String,
    /// Decoded subject.
    pub subject: String,
    /// Sender address.
    pub sender: String,
    /// Message timestamp; falls back to the fetch time when the Date
    /// header is missing or unparseable.
    pub date: DateTime<Utc>,
    /// Raw size in bytes.
    pub size: usize,
    /// Extracted content bundle.
    pub content: ContentBundle,
    /// Derived message type.
    pub message_type: MessageType,
    /// Importance on the counting scale.
    pub priority: Priority,
    /// Importance on the presence scale.
    pub severity: Severity,
    /// Routing category.
    pub category: Category,
    /// Derived key information.
    pub key_info: KeyInfo,
    /// Classification keywords that matched, for the trend log.
    pub keywords: Vec<String>,
}

/// Parses and fully derives one raw message.
///
/// # Errors
///
/// Returns an error only when the MIME header block cannot be parsed;
/// everything below that degrades to best-effort content.
pub fn analyze_message(
    raw: &[u8],
    id: &str,
    attachments_dir: &Path,
    fetched_at: DateTime<Utc>,
) -> Result<AnalyzedMessage> {
    let message = Message::parse(raw)?;

    let subject = message.subject();
    let sender = message.from();
    let date = message
        .date()
        .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
        .map_or(fetched_at, |d| d.with_timezone(&Utc));

    let content = extract_content(&message, id, attachments_dir);

    let message_type = classify_type(&subject);
    let priority = assess_priority(&subject, &content.text);
    let severity = assess_severity(&subject, &content.text, &content.structured);
    let category = categorize(&subject, &content.text);
    let key_info = extract_key_info(message_type, &content);
    let keywords = matched_keywords(&subject, &content.text);

    Ok(AnalyzedMessage {
        id: id.to_string(),
        subject,
        sender,
        date,
        size: raw.len(),
        content,
        message_type,
        priority,
        severity,
        category,
        key_info,
        keywords,
    })
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
        let dir = std::env::temp_dir().join("maildigest-message-tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_analyze_full_derivation() {
        let raw = b"From: advisor@example.com\r\n\
                    Subject: Capacity alert for arch-a1b2\r\n\
                    Date: Fri, 7 Aug 2026 08:30:00 +0000\r\n\
                    Content-Type: text/html\r\n\
                    \r\n\
                    <p>APPID: 999</p><p>CPU: 92%</p>";

        let message = analyze_message(raw, "101", &temp_dir(), fetched_at()).unwrap();

        assert_eq!(message.id, "101");
        assert_eq!(message.subject, "Capacity alert for arch-a1b2");
        assert_eq!(message.sender, "advisor@example.com");
        assert_eq!(message.date.to_rfc3339(), "2026-08-07T08:30:00+00:00");
        assert_eq!(message.message_type, MessageType::CapacityReport);
        assert_eq!(message.content.structured.app_id.as_deref(), Some("999"));
        assert!(message.key_info.summary.contains("arch-a1b2"));
        assert_eq!(message.size, raw.len());
    }

    #[test]
    fn test_analyze_bad_date_falls_back() {
        let raw = b"Subject: x\r\nDate: not a date\r\n\r\nbody";
        let message = analyze_message(raw, "1", &temp_dir(), fetched_at()).unwrap();
        assert_eq!(message.date, fetched_at());
    }

    #[test]
    fn test_scenario_decisions_category_and_high_priority() {
        let raw = b"Subject: Urgent: Budget Decision Needed\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    approve the budget increase";
        let message = analyze_message(raw, "1", &temp_dir(), fetched_at()).unwrap();
        assert_eq!(message.category, Category::Decisions);
        assert_eq!(message.priority, Priority::High);
    }

    #[test]
    fn test_encoded_subject_decoded() {
        let raw = b"Subject: =?utf-8?B?SMOpbGxv?= report\r\n\r\nbody";
        let message = analyze_message(raw, "1", &temp_dir(), fetched_at()).unwrap();
        assert_eq!(message.subject, "Héllo report");
    }
}
