//! HTML-to-text extraction.
//!
//! A small tag scanner, not a full HTML parser: strips tags, skips the
//! textual content of `<script>` and `<style>` elements, and collects every
//! anchor `href` value in document order. Malformed markup degrades to
//! whatever text can be recovered.

/// Text and links recovered from an HTML document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedHtml {
    /// Tag-stripped display text, segments joined by single spaces.
    pub text: String,
    /// Every `href` attribute of an anchor, in document order.
    pub links: Vec<String>,
}

/// Extracts display text and anchor links from HTML.
#[must_use]
pub fn extract_html(html: &str) -> ExtractedHtml {
    let mut segments: Vec<String> = Vec::new();
    let mut links = Vec::new();

    let mut rest = html;
    let mut in_script = false;
    let mut in_style = false;

    while let Some(open) = rest.find('<') {
        let data = &rest[..open];
        if !in_script && !in_style {
            push_segment(&mut segments, data);
        }

        let tag_area = &rest[open..];

        // Comments have their own terminator
        if tag_area.starts_with("<!--") {
            match tag_area.find("-->") {
                Some(end) => {
                    rest = &tag_area[end + 3..];
                    continue;
                }
                None => {
                    rest = "";
                    break;
                }
            }
        }

        let Some(close) = tag_area.find('>') else {
            // Unterminated tag: drop the rest
            rest = "";
            break;
        };

        let tag_body = &tag_area[1..close];
        let (name, is_closing) = tag_name(tag_body);

        match name.as_str() {
            "script" => in_script = !is_closing,
            "style" => in_style = !is_closing,
            "a" if !is_closing => {
                if let Some(href) = attribute_value(tag_body, "href") {
                    links.push(href);
                }
            }
            _ => {}
        }

        rest = &tag_area[close + 1..];
    }

    if !in_script && !in_style {
        push_segment(&mut segments, rest);
    }

    ExtractedHtml {
        text: segments.join(" "),
        links,
    }
}

fn push_segment(segments: &mut Vec<String>, data: &str) {
    let text = decode_entities(data.trim());
    if !text.is_empty() {
        segments.push(text);
    }
}

/// Lowercased tag name and whether it is a closing tag.
fn tag_name(tag_body: &str) -> (String, bool) {
    let trimmed = tag_body.trim();
    let (trimmed, is_closing) = trimmed
        .strip_prefix('/')
        .map_or((trimmed, false), |rest| (rest, true));

    let name: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();

    (name.to_lowercase(), is_closing)
}

/// Finds an attribute value inside a tag body, handling quoted and bare
/// values.
fn attribute_value(tag_body: &str, name: &str) -> Option<String> {
    let lower = tag_body.to_lowercase();
    let mut search_from = 0;

    while let Some(found) = lower[search_from..].find(name) {
        let at = search_from + found;

        // Must be a standalone attribute name, not a suffix of another
        let preceded_ok = at == 0
            || lower[..at]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_ascii_alphanumeric() && c != '-');
        if !preceded_ok {
            search_from = at + name.len();
            continue;
        }

        // Byte offsets come from the lowercased copy
        let Some(after) = tag_body.get(at + name.len()..) else {
            break;
        };
        let after = after.trim_start();

        if let Some(after_eq) = after.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let value = match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let inner = &after_eq[1..];
                    inner.find(quote).map(|end| inner[..end].to_string())
                }
                Some(_) => Some(
                    after_eq
                        .chars()
                        .take_while(|c| !c.is_whitespace() && *c != '>')
                        .collect(),
                ),
                None => None,
            };
            if let Some(value) = value {
                return Some(value);
            }
        }

        search_from = at + name.len();
    }

    None
}

/// Decodes the handful of entities that matter for display text.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
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
    fn test_strips_tags() {
        let out = extract_html("<html><body><p>Hello</p><p>World</p></body></html>");
        assert_eq!(out.text, "Hello World");
    }

    #[test]
    fn test_excludes_script_and_style_content() {
        let out = extract_html(
            "<script>ignored</script><style>.x{color:red}</style><p>APPID: 12345</p>",
        );
        assert_eq!(out.text, "APPID: 12345");
        assert!(!out.text.contains("ignored"));
    }

    #[test]
    fn test_collects_links_in_document_order() {
        let out = extract_html(
            "<a href=\"https://a.example/1\">one</a> \
             <a href='https://a.example/2'>two</a> \
             <a href=https://a.example/3>three</a>",
        );
        assert_eq!(
            out.links,
            vec![
                "https://a.example/1",
                "https://a.example/2",
                "https://a.example/3"
            ]
        );
        assert_eq!(out.text, "one two three");
    }

    #[test]
    fn test_anchor_without_href() {
        let out = extract_html("<a name=\"top\">anchor</a>");
        assert!(out.links.is_empty());
        assert_eq!(out.text, "anchor");
    }

    #[test]
    fn test_comments_skipped() {
        let out = extract_html("before<!-- <p>hidden</p> -->after");
        assert_eq!(out.text, "before after");
    }

    #[test]
    fn test_entities_decoded() {
        let out = extract_html("<p>usage &gt; 90% &amp; rising</p>");
        assert_eq!(out.text, "usage > 90% & rising");
    }

    #[test]
    fn test_unterminated_tag_degrades() {
        let out = extract_html("text <broken");
        assert_eq!(out.text, "text");
    }

    #[test]
    fn test_uppercase_tags() {
        let out = extract_html("<SCRIPT>nope</SCRIPT><P>yes</P>");
        assert_eq!(out.text, "yes");
    }
}
