//! Permissive MIME decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 encoded-word decoding.
//! All decoders in this module are total: malformed input degrades to a
//! best-effort result rather than an error, because a single bad byte in a
//! fetched message must never abort the pipeline.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decodes Base64 data, ignoring embedded whitespace.
///
/// Returns `None` if the cleaned input is not valid Base64; callers fall
/// back to the raw bytes.
#[must_use]
pub fn decode_base64(data: &str) -> Option<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).ok()
}

/// Decodes Quoted-Printable text (RFC 2045) into raw bytes.
///
/// Soft line breaks are removed. An invalid escape sequence is passed
/// through literally instead of failing.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // Soft line break: "=\r\n" or "=\n"
        if data.get(i + 1) == Some(&b'\r') && data.get(i + 2) == Some(&b'\n') {
            i += 3;
            continue;
        }
        if data.get(i + 1) == Some(&b'\n') {
            i += 2;
            continue;
        }

        // Hex-encoded byte
        if let (Some(&hi), Some(&lo)) = (data.get(i + 1), data.get(i + 2)) {
            if let (Some(hi), Some(lo)) = (hex_value(hi), hex_value(lo)) {
                result.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }

        // Invalid escape: keep the '=' literally
        result.push(b'=');
        i += 1;
    }

    result
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Converts bytes in a named charset to a string, permissively.
///
/// UTF-8 and US-ASCII decode lossily; Latin-1 maps bytes directly. Any
/// other (or unknown) charset falls back to lossy UTF-8, which keeps ASCII
/// content readable and replaces the rest.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: &str) -> String {
    let charset = charset.trim().to_ascii_lowercase();
    match charset.as_str() {
        "iso-8859-1" | "latin1" | "latin-1" => bytes.iter().map(|&b| b as char).collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decodes a header value containing RFC 2047 encoded words.
///
/// Handles multiple encoded words in one value, mixed with plain text, and
/// drops the whitespace between adjacent encoded words as the RFC requires.
/// A word with a missing or unknown charset decodes as lossy UTF-8; a word
/// that is not well-formed is kept verbatim. Never fails.
#[must_use]
pub fn decode_words(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    let mut last_was_encoded = false;

    while let Some(start) = rest.find("=?") {
        let gap = &rest[..start];
        if let Some((decoded, consumed)) = parse_encoded_word(&rest[start..]) {
            // Whitespace between two adjacent encoded words is not significant
            let drop_gap =
                last_was_encoded && !gap.is_empty() && gap.chars().all(char::is_whitespace);
            if !drop_gap {
                result.push_str(gap);
            }
            result.push_str(&decoded);
            last_was_encoded = true;
            rest = &rest[start + consumed..];
        } else {
            result.push_str(gap);
            result.push_str("=?");
            last_was_encoded = false;
            rest = &rest[start + 2..];
        }
    }

    result.push_str(rest);
    result
}

/// Parses one `=?charset?encoding?data?=` token at the start of `text`.
///
/// Returns the decoded text and the number of bytes consumed, or `None`
/// when the token is not well-formed.
fn parse_encoded_word(text: &str) -> Option<(String, usize)> {
    let inner = text.strip_prefix("=?")?;
    let charset_end = inner.find('?')?;
    let (charset, rest) = inner.split_at(charset_end);
    let rest = &rest[1..];

    let enc_end = rest.find('?')?;
    let (encoding, rest) = rest.split_at(enc_end);
    let rest = &rest[1..];

    let data_end = rest.find("?=")?;
    let data = &rest[..data_end];

    let consumed = 2 + charset_end + 1 + enc_end + 1 + data_end + 2;

    let bytes = match encoding {
        "B" | "b" => decode_base64(data)?,
        "Q" | "q" => decode_quoted_printable(data.replace('_', " ").as_bytes()),
        _ => return None,
    };

    Some((decode_charset(&bytes, charset), consumed))
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
    fn test_base64_decode() {
        assert_eq!(
            decode_base64("SGVsbG8sIFdvcmxkIQ==").unwrap(),
            b"Hello, World!"
        );
        // Whitespace embedded by line folding is ignored
        assert_eq!(
            decode_base64("SGVsbG8s\r\nIFdvcmxkIQ==").unwrap(),
            b"Hello, World!"
        );
        assert!(decode_base64("not base64!!!").is_none());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable(b"Hello, World!"), b"Hello, World!");
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo"), "Héllo".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld"), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_invalid_escape_kept() {
        assert_eq!(decode_quoted_printable(b"100=ZZ"), b"100=ZZ");
        assert_eq!(decode_quoted_printable(b"trailing="), b"trailing=");
    }

    #[test]
    fn test_decode_words_plain() {
        assert_eq!(decode_words("Hello"), "Hello");
        assert_eq!(decode_words(""), "");
    }

    #[test]
    fn test_decode_words_base64() {
        assert_eq!(decode_words("=?utf-8?B?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn test_decode_words_quoted_printable() {
        assert_eq!(decode_words("=?utf-8?Q?H=C3=A9llo?="), "Héllo");
        assert_eq!(decode_words("=?utf-8?Q?a_b?="), "a b");
    }

    #[test]
    fn test_decode_words_mixed_segments() {
        assert_eq!(
            decode_words("Re: =?utf-8?B?SMOpbGxv?= world"),
            "Re: Héllo world"
        );
    }

    #[test]
    fn test_decode_words_adjacent_words_drop_gap() {
        assert_eq!(
            decode_words("=?utf-8?Q?Hel?= =?utf-8?Q?lo?="),
            "Hello"
        );
    }

    #[test]
    fn test_decode_words_unknown_charset_degrades() {
        // gb2312 is not decoded natively; ASCII survives the lossy fallback
        assert_eq!(decode_words("=?gb2312?Q?report?="), "report");
    }

    #[test]
    fn test_decode_words_malformed_kept_verbatim() {
        assert_eq!(decode_words("=?broken"), "=?broken");
        assert_eq!(decode_words("price =? 100"), "price =? 100");
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_charset(&[0xE9], "iso-8859-1"), "é");
        assert_eq!(decode_charset(b"plain", "unknown-charset"), "plain");
    }

    use proptest::prelude::*;

    proptest! {
        // Decoding is total: arbitrary bytes and header text never panic
        #[test]
        fn prop_quoted_printable_total(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = decode_quoted_printable(&data);
        }

        #[test]
        fn prop_decode_words_total(text in ".{0,256}") {
            let _ = decode_words(&text);
        }

        #[test]
        fn prop_plain_ascii_passes_through(text in "[a-zA-Z0-9 ]{0,64}") {
            prop_assert_eq!(decode_words(&text), text);
        }
    }
}
