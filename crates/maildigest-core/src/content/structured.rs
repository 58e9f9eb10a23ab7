//! Structured-data extraction from raw HTML.
//!
//! Advisor mails embed identifiers, metric readings, alert text and report
//! links inside their HTML. These are scanned out of the raw markup (not
//! the tag-stripped display text) with fixed patterns.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum report links kept per message.
const MAX_REPORT_LINKS: usize = 5;

/// Context window around an alert keyword: bytes before / after the match.
const ALERT_CONTEXT_BEFORE: usize = 100;
const ALERT_CONTEXT_AFTER: usize = 200;

/// Minimum length for an alert or recommendation snippet to count as signal.
const MIN_SNIPPET_LEN: usize = 10;

/// Keywords whose surrounding context is captured as an alert snippet.
const ALERT_KEYWORDS: &[&str] = &["critical", "warning", "alert", "risk", "anomaly"];

#[allow(clippy::unwrap_used)]
static APP_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)APPID\s*:?\s*(\d+)").unwrap()
});

#[allow(clippy::unwrap_used)]
static ARCH_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)arch-[a-z0-9]+").unwrap()
});

#[allow(clippy::unwrap_used)]
static RESOURCE_METRIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(CPU|memory|disk|storage|bandwidth)\s*:?\s*(\d+(?:\.\d+)?)\s*(%|GB|MB|Mbps)")
        .unwrap()
});

#[allow(clippy::unwrap_used)]
static UTILIZATION_METRIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(usage|utilization)\s*:?\s*(\d+(?:\.\d+)?)\s*(%)").unwrap()
});

#[allow(clippy::unwrap_used)]
static RECOMMENDATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:recommend|suggest|optimi[sz]e)[^<>]{10,200}").unwrap()
});

#[allow(clippy::unwrap_used)]
static HREF_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href=["'](https?://[^"']+)["']"#).unwrap()
});

#[allow(clippy::unwrap_used)]
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]+>").unwrap()
});

/// Key metrics, alerts and links mechanically extracted from raw HTML.
///
/// Distinct from the tag-stripped display text: patterns here run against
/// the markup itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredData {
    /// Numeric application identifier, if present.
    pub app_id: Option<String>,
    /// Architecture identifier token, if present.
    pub architecture_id: Option<String>,
    /// Utilization-style metric phrases ("CPU 85%").
    pub metrics: Vec<String>,
    /// Context windows around alert keywords.
    pub alerts: Vec<String>,
    /// Recommendation phrases.
    pub recommendations: Vec<String>,
    /// Absolute report/dashboard links, deduplicated, capped.
    pub report_links: Vec<String>,
}

impl StructuredData {
    /// Returns true when nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.app_id.is_none()
            && self.architecture_id.is_none()
            && self.metrics.is_empty()
            && self.alerts.is_empty()
            && self.recommendations.is_empty()
            && self.report_links.is_empty()
    }
}

/// Scans raw HTML for structured advisor data.
#[must_use]
pub fn parse_html_data(html: &str) -> StructuredData {
    let mut data = StructuredData {
        app_id: APP_ID
            .captures(html)
            .map(|c| c[1].to_string()),
        architecture_id: ARCH_ID.find(html).map(|m| m.as_str().to_lowercase()),
        ..StructuredData::default()
    };

    for caps in RESOURCE_METRIC
        .captures_iter(html)
        .chain(UTILIZATION_METRIC.captures_iter(html))
    {
        data.metrics.push(format!("{}{}{}", &caps[1], &caps[2], &caps[3]));
    }

    data.alerts = alert_contexts(html);

    for m in RECOMMENDATION.find_iter(html).take(3) {
        let clean = strip_tags(m.as_str());
        if clean.len() > MIN_SNIPPET_LEN {
            data.recommendations.push(clean);
        }
    }

    data.report_links = collect_links(html);
    data
}

/// Captures a tag-stripped context window around the first occurrence of
/// each alert keyword.
fn alert_contexts(html: &str) -> Vec<String> {
    let lower = html.to_lowercase();
    let mut alerts = Vec::new();

    for keyword in ALERT_KEYWORDS {
        let Some(idx) = lower.find(keyword) else {
            continue;
        };

        let start = floor_char_boundary(html, idx.saturating_sub(ALERT_CONTEXT_BEFORE));
        let end = ceil_char_boundary(html, (idx + ALERT_CONTEXT_AFTER).min(html.len()));

        let context = strip_tags(&html[start..end]);
        if context.len() > MIN_SNIPPET_LEN {
            alerts.push(context);
        }
    }

    alerts
}

/// Absolute links from `href` attributes: order-preserving dedup, capped.
fn collect_links(html: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for caps in HREF_LINK.captures_iter(html) {
        let link = &caps[1];
        if !links.iter().any(|l| l == link) {
            links.push(link.to_string());
        }
        if links.len() == MAX_REPORT_LINKS {
            break;
        }
    }
    links
}

fn strip_tags(text: &str) -> String {
    TAG.replace_all(text, "").trim().to_string()
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
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
    fn test_app_id() {
        let data = parse_html_data("<p>APPID: 12345</p>");
        assert_eq!(data.app_id.as_deref(), Some("12345"));

        let data = parse_html_data("<p>appid 98765</p>");
        assert_eq!(data.app_id.as_deref(), Some("98765"));
    }

    #[test]
    fn test_architecture_id() {
        let data = parse_html_data("<td>arch-a1b2c3</td>");
        assert_eq!(data.architecture_id.as_deref(), Some("arch-a1b2c3"));
    }

    #[test]
    fn test_metrics() {
        let data = parse_html_data("<p>CPU: 85.5% memory 12 GB usage: 91%</p>");
        assert!(data.metrics.contains(&"CPU85.5%".to_string()));
        assert!(data.metrics.contains(&"memory12GB".to_string()));
        assert!(data.metrics.contains(&"usage91%".to_string()));
    }

    #[test]
    fn test_alert_context_window() {
        let html = "<table><tr><td>instance i-123 triggered a critical disk warning, \
                    utilization above the safe threshold</td></tr></table>";
        let data = parse_html_data(html);
        assert!(!data.alerts.is_empty());
        assert!(data.alerts[0].contains("critical"));
        // Tag text must not leak into the snippet
        assert!(!data.alerts[0].contains('<'));
    }

    #[test]
    fn test_short_alert_context_filtered() {
        let data = parse_html_data("risk");
        assert!(data.alerts.is_empty());
    }

    #[test]
    fn test_recommendations() {
        let data = parse_html_data(
            "<p>We recommend scaling the instance group before the holiday peak.</p>",
        );
        assert_eq!(data.recommendations.len(), 1);
        assert!(data.recommendations[0].starts_with("recommend"));
    }

    #[test]
    fn test_report_links_deduped_and_capped() {
        let mut html = String::new();
        for i in 0..8 {
            html.push_str(&format!("<a href=\"https://r.example/{i}\">x</a>"));
        }
        html.push_str("<a href=\"https://r.example/0\">dup</a>");

        let data = parse_html_data(&html);
        assert_eq!(data.report_links.len(), MAX_REPORT_LINKS);
        assert_eq!(data.report_links[0], "https://r.example/0");
    }

    #[test]
    fn test_relative_links_ignored() {
        let data = parse_html_data("<a href=\"/relative/path\">x</a>");
        assert!(data.report_links.is_empty());
    }

    #[test]
    fn test_empty_html() {
        assert!(parse_html_data("").is_empty());
    }
}
