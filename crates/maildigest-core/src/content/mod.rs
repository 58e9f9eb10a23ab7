//! Content extraction: raw mail message to normalized content bundle.
//!
//! Walks every body part of a parsed message, persists attachments, and
//! derives plain text, HTML display text, links and structured data. Any
//! per-part decode failure is logged and skipped; extraction of the
//! remaining parts always continues.

pub mod html;
pub mod structured;

use std::path::Path;

use maildigest_mime::{Message, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attachment::{AttachmentDescriptor, recognize_kind, stored_name};

pub use html::{ExtractedHtml, extract_html};
pub use structured::{StructuredData, parse_html_data};

/// Normalized content of one message, owned by that message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBundle {
    /// Plain text, concatenated over text parts in part order. Falls back
    /// to the HTML-derived text when no plain part exists.
    pub text: String,
    /// Raw HTML, concatenated over HTML parts.
    pub html: String,
    /// Tag-stripped text derived from the HTML.
    pub html_text: String,
    /// Anchor hrefs in document order.
    pub links: Vec<String>,
    /// Descriptors of persisted attachments.
    pub attachments: Vec<AttachmentDescriptor>,
    /// Structured data scanned out of the raw HTML.
    pub structured: StructuredData,
}

/// Extracts the content bundle from a parsed message, persisting
/// attachments under `attachments_dir` as `<message-id>_<filename>`.
#[must_use]
pub fn extract_content(message: &Message, message_id: &str, attachments_dir: &Path) -> ContentBundle {
    let mut bundle = ContentBundle::default();

    if message.is_multipart() {
        for part in &message.parts {
            extract_part(part, message_id, attachments_dir, &mut bundle);
        }
    } else {
        let body = message.body_text();
        if message.content_type().is_text_html() {
            bundle.html = body;
        } else {
            bundle.text = body;
        }
    }

    if !bundle.html.is_empty() {
        let extracted = extract_html(&bundle.html);
        bundle.html_text = extracted.text;
        bundle.links = extracted.links;
        bundle.structured = parse_html_data(&bundle.html);
    }

    // No plain part: fall back to the HTML-derived text
    if bundle.text.trim().is_empty() && !bundle.html_text.is_empty() {
        bundle.text = bundle.html_text.clone();
    }
    bundle.text = bundle.text.trim().to_string();

    bundle
}

fn extract_part(part: &Part, message_id: &str, attachments_dir: &Path, bundle: &mut ContentBundle) {
    if is_attachment_part(part) {
        if let Some(descriptor) = save_attachment(part, message_id, attachments_dir) {
            bundle.attachments.push(descriptor);
        }
        return;
    }

    let content_type = part.content_type();
    if content_type.is_text_plain() {
        bundle.text.push_str(&part.body_text());
    } else if content_type.is_text_html() {
        bundle.html.push_str(&part.body_text());
    }
}

/// A part is an attachment when it declares the disposition, or (degenerate
/// case) carries a filename with no body content.
fn is_attachment_part(part: &Part) -> bool {
    if part.disposition().is_some_and(|d| d.is_attachment()) {
        return true;
    }
    part.filename().is_some() && part.body.is_empty()
}

/// Persists one attachment part; returns its descriptor.
///
/// Failures are logged and swallowed so the rest of the message still
/// extracts.
fn save_attachment(
    part: &Part,
    message_id: &str,
    attachments_dir: &Path,
) -> Option<AttachmentDescriptor> {
    let original_name = part.filename()?;
    let stored = stored_name(message_id, &original_name);
    let path = attachments_dir.join(&stored);

    if let Err(e) = std::fs::create_dir_all(attachments_dir) {
        warn!(error = %e, "cannot create attachments directory");
        return None;
    }

    let payload = part.decoded_body();
    if let Err(e) = std::fs::write(&path, &payload) {
        warn!(file = %stored, error = %e, "failed to save attachment");
        return None;
    }

    let mime_type = part.content_type().essence();
    let kind = recognize_kind(&original_name, &mime_type);

    debug!(file = %stored, size = payload.len(), "saved attachment");

    Some(AttachmentDescriptor {
        original_name,
        stored_name: stored,
        path,
        size: payload.len() as u64,
        mime_type,
        kind,
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
    use crate::attachment::AttachmentKind;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("maildigest-content-tests").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_plain_and_html_parts() {
        let raw = b"Content-Type: multipart/alternative; boundary=B\r\n\
                    \r\n\
                    --B\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    plain body\r\n\
                    --B\r\n\
                    Content-Type: text/html\r\n\
                    \r\n\
                    <p>html body</p>\r\n\
                    --B--\r\n";

        let message = Message::parse(raw).unwrap();
        let bundle = extract_content(&message, "1", &temp_dir("plain-html"));

        assert_eq!(bundle.text, "plain body");
        assert_eq!(bundle.html_text, "html body");
    }

    #[test]
    fn test_html_fallback_when_no_plain_part() {
        let raw = b"Content-Type: text/html\r\n\
                    \r\n\
                    <script>ignored()</script><p>APPID: 12345</p>";

        let message = Message::parse(raw).unwrap();
        let bundle = extract_content(&message, "2", &temp_dir("fallback"));

        assert_eq!(bundle.text, "APPID: 12345");
        assert!(!bundle.text.contains("ignored"));
        assert_eq!(bundle.structured.app_id.as_deref(), Some("12345"));
    }

    #[test]
    fn test_attachment_saved_with_message_scoped_name() {
        let dir = temp_dir("save");
        let raw = b"Content-Type: multipart/mixed; boundary=B\r\n\
                    \r\n\
                    --B\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    see attachment\r\n\
                    --B\r\n\
                    Content-Type: text/csv\r\n\
                    Content-Disposition: attachment; filename=\"usage report.csv\"\r\n\
                    \r\n\
                    a,b\r\n1,2\r\n\
                    --B--\r\n";

        let message = Message::parse(raw).unwrap();
        let bundle = extract_content(&message, "77", &dir);

        assert_eq!(bundle.attachments.len(), 1);
        let descriptor = &bundle.attachments[0];
        assert_eq!(descriptor.original_name, "usage report.csv");
        assert_eq!(descriptor.stored_name, "77_usage_report.csv");
        assert_eq!(descriptor.kind, AttachmentKind::Csv);
        assert!(descriptor.path.exists());
        assert_eq!(std::fs::read(&descriptor.path).unwrap(), b"a,b\r\n1,2");

        // Attachment content never leaks into the body text
        assert_eq!(bundle.text, "see attachment");

        std::fs::remove_file(&descriptor.path).ok();
    }

    #[test]
    fn test_base64_attachment_decoded_before_saving() {
        let dir = temp_dir("b64");
        let raw = b"Content-Type: multipart/mixed; boundary=B\r\n\
                    \r\n\
                    --B\r\n\
                    Content-Type: application/pdf\r\n\
                    Content-Transfer-Encoding: base64\r\n\
                    Content-Disposition: attachment; filename=\"r.pdf\"\r\n\
                    \r\n\
                    JVBERg==\r\n\
                    --B--\r\n";

        let message = Message::parse(raw).unwrap();
        let bundle = extract_content(&message, "5", &dir);

        assert_eq!(bundle.attachments.len(), 1);
        assert_eq!(std::fs::read(&bundle.attachments[0].path).unwrap(), b"%PDF");
        std::fs::remove_file(&bundle.attachments[0].path).ok();
    }

    #[test]
    fn test_links_collected_in_order() {
        let raw = b"Content-Type: text/html\r\n\
                    \r\n\
                    <a href=\"https://x.example/b\">b</a><a href=\"https://x.example/a\">a</a>";
        let message = Message::parse(raw).unwrap();
        let bundle = extract_content(&message, "3", &temp_dir("links"));
        assert_eq!(
            bundle.links,
            vec!["https://x.example/b", "https://x.example/a"]
        );
    }

    #[test]
    fn test_single_part_plain() {
        let raw = b"Content-Type: text/plain\r\n\r\njust text";
        let message = Message::parse(raw).unwrap();
        let bundle = extract_content(&message, "4", &temp_dir("single"));
        assert_eq!(bundle.text, "just text");
        assert!(bundle.structured.is_empty());
    }
}
