//! MIME header handling.

use crate::encoding::decode_words;
use crate::error::Result;
use std::collections::HashMap;

/// Collection of email headers.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        let value = value.into();
        self.headers.entry(name).or_default().push(value);
    }

    /// Gets the first raw value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets all raw values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Gets the first value for a header with RFC 2047 encoded words
    /// decoded. Returns an empty string when the header is absent.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> String {
        self.get(name).map(decode_words).unwrap_or_default()
    }

    /// Returns an iterator over all headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Parses headers from raw text.
    ///
    /// Headers are in the format:
    /// ```text
    /// Header-Name: value
    ///  continuation line
    /// ```
    ///
    /// Lines that are neither a `name: value` pair nor a continuation are
    /// skipped; mailbox content is not trusted to be well-formed.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` is kept for parser-level callers.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut current_name: Option<String> = None;
        let mut current_value = String::new();

        for line in text.lines() {
            if line.is_empty() {
                // Empty line signals end of headers, but save current header first
                if let Some(name) = current_name.take() {
                    headers.add(name, current_value.trim().to_string());
                }
                break;
            }

            // Continuation line (starts with space or tab)
            if line.starts_with(' ') || line.starts_with('\t') {
                if current_name.is_some() {
                    current_value.push(' ');
                    current_value.push_str(line.trim());
                }
            } else {
                // Save previous header if exists
                if let Some(name) = current_name.take() {
                    headers.add(name, current_value.trim().to_string());
                    current_value.clear();
                }

                if let Some((name, value)) = line.split_once(':') {
                    current_name = Some(name.trim().to_string());
                    current_value = value.trim().to_string();
                }
            }
        }

        // Save last header if we didn't hit an empty line
        if let Some(name) = current_name {
            headers.add(name, current_value.trim().to_string());
        }

        Ok(headers)
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

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_parse_folded() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "Subject: Capacity Report\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n"
        );

        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("Capacity Report"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_headers_parse_skips_garbage_lines() {
        let text = "From: a@b.c\r\nnot a header line\r\nTo: d@e.f\r\n\r\n";
        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.get("From"), Some("a@b.c"));
        assert_eq!(headers.get("To"), Some("d@e.f"));
    }

    #[test]
    fn test_headers_get_decoded() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?B?SMOpbGxv?= world");
        assert_eq!(headers.get_decoded("Subject"), "Héllo world");
        assert_eq!(headers.get_decoded("Missing"), "");
    }

    #[test]
    fn test_headers_iter() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");
        assert_eq!(headers.iter().count(), 2);
    }
}
