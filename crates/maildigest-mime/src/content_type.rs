//! MIME content type and disposition handling.

use crate::encoding::decode_words;
use std::collections::HashMap;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Returns the `type/subtype` essence, lowercased.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is text/plain.
    #[must_use]
    pub fn is_text_plain(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text") && self.sub_type.eq_ignore_ascii_case("plain")
    }

    /// Checks if this is text/html.
    #[must_use]
    pub fn is_text_html(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text") && self.sub_type.eq_ignore_ascii_case("html")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// Falls back to `text/plain` when the type part is malformed; header
    /// values in fetched mail are not trusted.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split(';');

        let type_str = parts.next().unwrap_or("").trim();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .map_or(("text", "plain"), |(m, s)| (m.trim(), s.trim()));

        let mut ct = Self::new(main_type.to_lowercase(), sub_type.to_lowercase());
        ct.parameters = parse_parameters(parts);
        ct
    }
}

/// MIME content disposition with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition kind, lowercased (e.g., "inline", "attachment").
    pub kind: String,
    /// Parameters (e.g., filename).
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a content disposition string.
    ///
    /// Format: `attachment; filename="report.xlsx"`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split(';');
        let kind = parts.next().unwrap_or("").trim().to_lowercase();
        Self {
            kind,
            parameters: parse_parameters(parts),
        }
    }

    /// Checks whether this declares an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// Returns the filename parameter, with RFC 2047 encoded words decoded.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.parameters
            .get("filename")
            .map(|name| decode_words(name))
    }
}

/// Parses `key=value` parameter segments, stripping optional quotes.
fn parse_parameters<'a>(parts: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            let key = key.trim().to_lowercase();
            let value = value.trim().trim_matches('"').to_string();
            parameters.insert(key, value);
        }
    }
    parameters
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
    fn test_parse_simple() {
        let ct = ContentType::parse("text/html");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "html");
        assert!(ct.is_text_html());
    }

    #[test]
    fn test_parse_with_parameters() {
        let ct = ContentType::parse("text/plain; charset=utf-8");
        assert!(ct.is_text_plain());
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_parse_quoted_boundary() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"==abc123==\"");
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("==abc123=="));
    }

    #[test]
    fn test_parse_malformed_defaults_to_text_plain() {
        let ct = ContentType::parse("garbage");
        assert!(ct.is_text_plain());
    }

    #[test]
    fn test_disposition_attachment() {
        let cd = ContentDisposition::parse("attachment; filename=\"usage report.xlsx\"");
        assert!(cd.is_attachment());
        assert_eq!(cd.filename().unwrap(), "usage report.xlsx");
    }

    #[test]
    fn test_disposition_inline() {
        let cd = ContentDisposition::parse("inline");
        assert!(!cd.is_attachment());
        assert!(cd.filename().is_none());
    }

    #[test]
    fn test_disposition_encoded_filename() {
        let cd = ContentDisposition::parse("attachment; filename=\"=?utf-8?B?SMOpbGxv?=.pdf\"");
        assert_eq!(cd.filename().unwrap(), "Héllo.pdf");
    }
}
