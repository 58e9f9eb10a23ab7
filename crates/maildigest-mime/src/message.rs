//! MIME message structure and parsing.

use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable};
use crate::error::Result;
use crate::header::Headers;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// One leaf part of a MIME message.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body (raw, still transfer-encoded).
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Gets the content type, defaulting to text/plain.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .map_or_else(ContentType::text_plain, ContentType::parse)
    }

    /// Gets the content disposition, if declared.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Gets the attachment filename, checking the disposition first and the
    /// content-type `name` parameter as a fallback.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        if let Some(name) = self.disposition().and_then(|d| d.filename()) {
            return Some(name);
        }
        self.content_type()
            .parameters
            .get("name")
            .map(|n| crate::encoding::decode_words(n))
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// Malformed Base64 degrades to the raw bytes; Quoted-Printable is
    /// decoded permissively. Never fails.
    #[must_use]
    pub fn decoded_body(&self) -> Vec<u8> {
        decode_transfer(&self.body, self.transfer_encoding())
    }

    /// Gets the decoded body as text, using the declared charset
    /// permissively. Never fails.
    #[must_use]
    pub fn body_text(&self) -> String {
        let decoded = self.decoded_body();
        let ct = self.content_type();
        decode_charset(&decoded, ct.charset().unwrap_or("utf-8"))
    }
}

fn decode_transfer(body: &[u8], encoding: TransferEncoding) -> Vec<u8> {
    match encoding {
        TransferEncoding::Base64 => {
            let body_str = String::from_utf8_lossy(body);
            decode_base64(&body_str).unwrap_or_else(|| body.to_vec())
        }
        TransferEncoding::QuotedPrintable => decode_quoted_printable(body),
        _ => body.to_vec(),
    }
}

/// A parsed MIME message.
///
/// Multipart messages carry their leaf parts flattened in document order;
/// single-part messages carry the body directly.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Leaf parts in document order (empty for single-part messages).
    pub parts: Vec<Part>,
    /// Body for single-part messages.
    pub body: Option<Vec<u8>>,
}

impl Message {
    /// Parses a raw RFC 822 message.
    ///
    /// Nested multiparts are flattened into `parts` in document order. A
    /// multipart message with a missing boundary degrades to single-part.
    ///
    /// # Errors
    ///
    /// Returns an error if the header block cannot be parsed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let (head, body) = split_head_body(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(head))?;

        let content_type = headers
            .get("content-type")
            .map_or_else(ContentType::text_plain, ContentType::parse);

        if content_type.is_multipart() {
            if let Some(boundary) = content_type.boundary() {
                let boundary = boundary.to_string();
                let mut parts = Vec::new();
                collect_parts(body, &boundary, &mut parts)?;
                return Ok(Self {
                    headers,
                    parts,
                    body: None,
                });
            }
        }

        Ok(Self {
            headers,
            parts: Vec::new(),
            body: Some(body.to_vec()),
        })
    }

    /// Gets the content type, defaulting to text/plain.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .map_or_else(ContentType::text_plain, ContentType::parse)
    }

    /// Checks if this is a multipart message.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Gets the Subject header with encoded words decoded.
    #[must_use]
    pub fn subject(&self) -> String {
        self.headers.get_decoded("subject")
    }

    /// Gets the From header with encoded words decoded.
    #[must_use]
    pub fn from(&self) -> String {
        self.headers.get_decoded("from")
    }

    /// Gets the raw Date header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.headers.get("date")
    }

    /// Gets the decoded body text of a single-part message, or an empty
    /// string for multipart messages. Never fails.
    #[must_use]
    pub fn body_text(&self) -> String {
        let Some(body) = self.body.as_ref() else {
            return String::new();
        };

        let encoding = self
            .headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);

        let decoded = decode_transfer(body, encoding);
        let ct = self.content_type();
        decode_charset(&decoded, ct.charset().unwrap_or("utf-8"))
    }
}

/// Splits raw message bytes at the first blank line.
///
/// A message with no blank line is treated as all headers.
fn split_head_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'\n' if raw.get(i + 1) == Some(&b'\n') => {
                return (&raw[..i + 1], &raw[i + 2..]);
            }
            b'\n' if raw.get(i + 1) == Some(&b'\r') && raw.get(i + 2) == Some(&b'\n') => {
                return (&raw[..i + 1], &raw[i + 3..]);
            }
            _ => {}
        }
        i += 1;
    }
    (raw, &[])
}

/// Recursively splits a multipart body, flattening leaf parts into `out`.
fn collect_parts(body: &[u8], boundary: &str, out: &mut Vec<Part>) -> Result<()> {
    for section in split_multipart(body, boundary) {
        let (head, part_body) = split_head_body(&section);
        let headers = Headers::parse(&String::from_utf8_lossy(head))?;

        let content_type = headers
            .get("content-type")
            .map_or_else(ContentType::text_plain, ContentType::parse);

        if content_type.is_multipart() {
            if let Some(inner) = content_type.boundary() {
                let inner = inner.to_string();
                collect_parts(part_body, &inner, out)?;
                continue;
            }
        }

        out.push(Part::new(headers, part_body.to_vec()));
    }
    Ok(())
}

/// Splits a multipart body into sections between boundary delimiter lines.
///
/// The preamble and epilogue are discarded. A missing closing delimiter is
/// tolerated; the trailing section is kept.
fn split_multipart(body: &[u8], boundary: &str) -> Vec<Vec<u8>> {
    let delimiter = format!("--{boundary}");
    let closing = format!("--{boundary}--");

    let mut sections = Vec::new();
    let mut current: Option<Vec<u8>> = None;

    for line in lines_inclusive(body) {
        let trimmed = trim_line_ending(line);

        if trimmed == closing.as_bytes() {
            if let Some(section) = current.take() {
                sections.push(strip_trailing_newline(section));
            }
            break;
        }

        if trimmed == delimiter.as_bytes() {
            if let Some(section) = current.take() {
                sections.push(strip_trailing_newline(section));
            }
            current = Some(Vec::new());
            continue;
        }

        if let Some(section) = current.as_mut() {
            section.extend_from_slice(line);
        }
    }

    if let Some(section) = current {
        sections.push(strip_trailing_newline(section));
    }

    sections
}

fn lines_inclusive(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut start = 0;
    std::iter::from_fn(move || {
        if start >= data.len() {
            return None;
        }
        let end = data[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |p| start + p + 1);
        let line = &data[start..end];
        start = end;
        Some(line)
    })
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

// The line break before a boundary belongs to the delimiter, not the body.
fn strip_trailing_newline(mut section: Vec<u8>) -> Vec<u8> {
    if section.ends_with(b"\n") {
        section.pop();
    }
    if section.ends_with(b"\r") {
        section.pop();
    }
    section
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
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_parse_single_part() {
        let raw = b"From: advisor@example.com\r\n\
                    Subject: Test\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    Hello, World!";

        let message = Message::parse(raw).unwrap();
        assert!(!message.is_multipart());
        assert_eq!(message.subject(), "Test");
        assert_eq!(message.from(), "advisor@example.com");
        assert_eq!(message.body_text(), "Hello, World!");
    }

    #[test]
    fn test_parse_multipart() {
        let raw = b"From: a@b.c\r\n\
                    Subject: Report\r\n\
                    Content-Type: multipart/mixed; boundary=XYZ\r\n\
                    \r\n\
                    preamble is ignored\r\n\
                    --XYZ\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    Plain body\r\n\
                    --XYZ\r\n\
                    Content-Type: text/html\r\n\
                    \r\n\
                    <p>Html body</p>\r\n\
                    --XYZ--\r\n";

        let message = Message::parse(raw).unwrap();
        assert_eq!(message.parts.len(), 2);
        assert_eq!(message.parts[0].body_text(), "Plain body");
        assert_eq!(message.parts[1].body_text(), "<p>Html body</p>");
        assert!(message.parts[1].content_type().is_text_html());
    }

    #[test]
    fn test_parse_nested_multipart_flattens() {
        let raw = b"Content-Type: multipart/mixed; boundary=OUTER\r\n\
                    \r\n\
                    --OUTER\r\n\
                    Content-Type: multipart/alternative; boundary=INNER\r\n\
                    \r\n\
                    --INNER\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    text\r\n\
                    --INNER\r\n\
                    Content-Type: text/html\r\n\
                    \r\n\
                    <b>html</b>\r\n\
                    --INNER--\r\n\
                    --OUTER\r\n\
                    Content-Type: application/pdf\r\n\
                    Content-Disposition: attachment; filename=\"r.pdf\"\r\n\
                    \r\n\
                    %PDF\r\n\
                    --OUTER--\r\n";

        let message = Message::parse(raw).unwrap();
        assert_eq!(message.parts.len(), 3);
        assert_eq!(message.parts[0].body_text(), "text");
        assert_eq!(message.parts[1].body_text(), "<b>html</b>");
        assert_eq!(message.parts[2].filename().unwrap(), "r.pdf");
        assert!(message.parts[2].disposition().unwrap().is_attachment());
    }

    #[test]
    fn test_parse_multipart_missing_boundary_degrades() {
        let raw = b"Content-Type: multipart/mixed\r\n\r\nwhatever";
        let message = Message::parse(raw).unwrap();
        assert!(!message.is_multipart());
        assert_eq!(message.body_text(), "whatever");
    }

    #[test]
    fn test_parse_multipart_unterminated() {
        let raw = b"Content-Type: multipart/mixed; boundary=B\r\n\
                    \r\n\
                    --B\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    no closing delimiter";

        let message = Message::parse(raw).unwrap();
        assert_eq!(message.parts.len(), 1);
        assert_eq!(message.parts[0].body_text(), "no closing delimiter");
    }

    #[test]
    fn test_part_base64_body() {
        let mut headers = Headers::new();
        headers.add("content-type", "text/plain; charset=utf-8");
        headers.add("content-transfer-encoding", "base64");
        let part = Part::new(headers, b"SGVsbG8sIFdvcmxkIQ==".to_vec());
        assert_eq!(part.body_text(), "Hello, World!");
    }

    #[test]
    fn test_part_invalid_base64_degrades_to_raw() {
        let mut headers = Headers::new();
        headers.add("content-transfer-encoding", "base64");
        let part = Part::new(headers, b"!!! not base64 !!!".to_vec());
        assert_eq!(part.decoded_body(), b"!!! not base64 !!!");
    }

    #[test]
    fn test_part_quoted_printable_body() {
        let mut headers = Headers::new();
        headers.add("content-transfer-encoding", "quoted-printable");
        let part = Part::new(headers, b"usage =3D 95%".to_vec());
        assert_eq!(part.body_text(), "usage = 95%");
    }

    #[test]
    fn test_single_part_base64_message() {
        let raw = b"Subject: Enc\r\n\
                    Content-Type: text/plain; charset=utf-8\r\n\
                    Content-Transfer-Encoding: base64\r\n\
                    \r\n\
                    SGVsbG8=";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.body_text(), "Hello");
    }

    #[test]
    fn test_headers_only_message() {
        let raw = b"Subject: Nothing else";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.subject(), "Nothing else");
        assert_eq!(message.body_text(), "");
    }
}
