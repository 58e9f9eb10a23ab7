//! Attachment descriptors and the decoder contract.
//!
//! Attachment payloads are persisted once at parse time and never read back
//! by the pipeline itself. Decoding their contents (spreadsheets, PDFs) is
//! a collaborator concern behind [`AttachmentDecoder`]; the pipeline only
//! consumes the returned summary for the rendered digest, never for
//! classification.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Recognized attachment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// Comma-separated values.
    Csv,
    /// Excel workbook.
    Excel,
    /// PDF document.
    Pdf,
    /// Image of any type.
    Image,
    /// Anything else.
    Other,
}

/// Metadata for one persisted attachment.
///
/// Written once when the message is parsed; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    /// Filename as declared by the sender (decoded).
    pub original_name: String,
    /// Sanitized on-disk filename, unique per message.
    pub stored_name: String,
    /// Full path of the stored file.
    pub path: PathBuf,
    /// Stored size in bytes.
    pub size: u64,
    /// Declared MIME type.
    pub mime_type: String,
    /// Recognized kind, derived from extension and MIME type.
    pub kind: AttachmentKind,
}

impl AttachmentDescriptor {
    /// True when the attachment is a CSV file.
    #[must_use]
    pub fn is_csv(&self) -> bool {
        self.kind == AttachmentKind::Csv
    }
}

/// Classifies an attachment by filename extension and MIME type.
#[must_use]
pub fn recognize_kind(filename: &str, mime_type: &str) -> AttachmentKind {
    let lower = filename.to_lowercase();
    if lower.ends_with(".csv") {
        AttachmentKind::Csv
    } else if lower.ends_with(".xls") || lower.ends_with(".xlsx") {
        AttachmentKind::Excel
    } else if lower.ends_with(".pdf") {
        AttachmentKind::Pdf
    } else if mime_type.starts_with("image/") {
        AttachmentKind::Image
    } else {
        AttachmentKind::Other
    }
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Builds the unique stored filename for an attachment.
///
/// The message id prefix makes persistence append-only: no two messages
/// can collide on the same stored path.
#[must_use]
pub fn stored_name(message_id: &str, filename: &str) -> String {
    format!("{}_{}", sanitize_filename(message_id), sanitize_filename(filename))
}

/// Per-column numeric statistics from a decoded attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Column name.
    pub column: String,
    /// Arithmetic mean.
    pub mean: f64,
    /// Maximum value.
    pub max: f64,
    /// Minimum value.
    pub min: f64,
}

/// Structured summary of a decoded attachment.
///
/// A failed decode is captured in `error` rather than propagated; one
/// unreadable file must not fail the enclosing message or run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentSummary {
    /// Original filename.
    pub filename: String,
    /// Kind label ("csv", "excel", "pdf", ...).
    pub kind: String,
    /// File size in bytes.
    pub size: u64,
    /// Sheet count, for workbook formats.
    pub sheets: Option<usize>,
    /// Data row count.
    pub rows: Option<usize>,
    /// Page count, for paged formats.
    pub pages: Option<usize>,
    /// Extracted table count.
    pub tables: Option<usize>,
    /// Column names, capped by the decoder.
    pub columns: Vec<String>,
    /// Numeric column statistics.
    pub column_stats: Vec<ColumnStats>,
    /// Leading text preview.
    pub text_preview: String,
    /// Alert snippets found in the content.
    pub alerts: Vec<String>,
    /// Recommendation snippets found in the content.
    pub recommendations: Vec<String>,
    /// Decode failure description, if any.
    pub error: Option<String>,
}

/// Decodes stored attachments into summaries for the digest.
pub trait AttachmentDecoder {
    /// Produces a summary for one stored attachment. Must not fail:
    /// problems are reported through the summary's `error` field.
    fn decode(&self, descriptor: &AttachmentDescriptor) -> AttachmentSummary;
}

/// Built-in decoder: delimited-text preview for CSV files, error
/// descriptors for formats that need an external decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicDecoder;

impl AttachmentDecoder for BasicDecoder {
    fn decode(&self, descriptor: &AttachmentDescriptor) -> AttachmentSummary {
        let mut summary = AttachmentSummary {
            filename: descriptor.original_name.clone(),
            kind: kind_label(descriptor.kind).to_string(),
            size: descriptor.size,
            ..AttachmentSummary::default()
        };

        match descriptor.kind {
            AttachmentKind::Csv => decode_csv(&descriptor.path, &mut summary),
            AttachmentKind::Excel | AttachmentKind::Pdf => {
                summary.error = Some(format!(
                    "no decoder available for {} attachments",
                    summary.kind
                ));
            }
            AttachmentKind::Image | AttachmentKind::Other => {
                summary.error = Some(format!(
                    "unsupported attachment type: {}",
                    descriptor.mime_type
                ));
            }
        }

        summary
    }
}

const fn kind_label(kind: AttachmentKind) -> &'static str {
    match kind {
        AttachmentKind::Csv => "csv",
        AttachmentKind::Excel => "excel",
        AttachmentKind::Pdf => "pdf",
        AttachmentKind::Image => "image",
        AttachmentKind::Other => "unknown",
    }
}

/// Number of leading data lines kept as the preview.
const PREVIEW_LINES: usize = 5;

/// Numeric columns profiled per file.
const STAT_COLUMNS: usize = 3;

fn decode_csv(path: &Path, summary: &mut AttachmentSummary) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            summary.error = Some(e.to_string());
            return;
        }
    };

    let mut lines = content.lines();
    let Some(header) = lines.next() else {
        summary.rows = Some(0);
        return;
    };

    let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
    let records: Vec<Vec<&str>> = lines
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.split(',').map(str::trim).collect())
        .collect();

    summary.rows = Some(records.len());
    summary.columns = columns.iter().take(10).cloned().collect();
    summary.text_preview = content
        .lines()
        .take(PREVIEW_LINES + 1)
        .collect::<Vec<_>>()
        .join("\n");

    // Profile the first few fully-numeric columns
    let mut profiled = 0;
    for (i, column) in columns.iter().enumerate() {
        if profiled == STAT_COLUMNS {
            break;
        }
        let values: Vec<f64> = records
            .iter()
            .filter_map(|r| r.get(i))
            .filter_map(|v| v.parse::<f64>().ok())
            .collect();
        if values.is_empty() || values.len() < records.len() {
            continue;
        }

        let sum: f64 = values.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = sum / values.len() as f64;
        let max = values.iter().copied().fold(f64::MIN, f64::max);
        let min = values.iter().copied().fold(f64::MAX, f64::min);

        summary.column_stats.push(ColumnStats {
            column: column.clone(),
            mean,
            max,
            min,
        });
        profiled += 1;
    }
}

/// Renders the decoder summaries as a markdown section for the digest.
#[must_use]
pub fn render_attachment_summaries(summaries: &[AttachmentSummary]) -> String {
    if summaries.is_empty() {
        return String::new();
    }

    let mut md = String::from("### Attachment Analysis\n\n");

    for summary in summaries {
        let _ = writeln!(md, "#### {}", summary.filename);
        let _ = writeln!(md, "- **Type**: {}", summary.kind.to_uppercase());

        if let Some(error) = &summary.error {
            let _ = writeln!(md, "- **Status**: decode failed - {error}");
            md.push('\n');
            continue;
        }

        if let Some(rows) = summary.rows {
            let _ = writeln!(md, "- **Rows**: {rows}");
        }
        if let Some(pages) = summary.pages {
            let _ = writeln!(md, "- **Pages**: {pages}");
        }
        if !summary.columns.is_empty() {
            let _ = writeln!(md, "- **Columns**: {}", summary.columns.join(", "));
        }
        if !summary.column_stats.is_empty() {
            md.push_str("- **Key metrics**:\n");
            for stats in summary.column_stats.iter().take(3) {
                let _ = writeln!(
                    md,
                    "  - {}: mean {:.2}, max {:.2}",
                    stats.column, stats.mean, stats.max
                );
            }
        }
        if !summary.alerts.is_empty() {
            md.push_str("- **Alerts**:\n");
            for alert in summary.alerts.iter().take(2) {
                let _ = writeln!(md, "  - {}", truncate(alert, 80));
            }
        }
        md.push('\n');
    }

    md
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
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
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("usage report.xlsx"), "usage_report.xlsx");
        assert_eq!(sanitize_filename("a/b\\c.pdf"), "a_b_c.pdf");
        assert_eq!(sanitize_filename("safe-name_1.csv"), "safe-name_1.csv");
    }

    #[test]
    fn test_stored_name_is_message_scoped() {
        assert_eq!(stored_name("42", "report.csv"), "42_report.csv");
        assert_eq!(stored_name("4 2", "re port.csv"), "4_2_re_port.csv");
    }

    #[test]
    fn test_recognize_kind() {
        assert_eq!(recognize_kind("a.csv", "text/csv"), AttachmentKind::Csv);
        assert_eq!(
            recognize_kind("A.XLSX", "application/octet-stream"),
            AttachmentKind::Excel
        );
        assert_eq!(recognize_kind("r.pdf", "application/pdf"), AttachmentKind::Pdf);
        assert_eq!(recognize_kind("p.png", "image/png"), AttachmentKind::Image);
        assert_eq!(recognize_kind("x.bin", "application/zip"), AttachmentKind::Other);
    }

    #[test]
    fn test_basic_decoder_csv() {
        let dir = std::env::temp_dir().join("maildigest-test-attachments");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("usage.csv");
        std::fs::write(&path, "instance,cpu\na,80\nb,90\nc,100\n").unwrap();

        let descriptor = AttachmentDescriptor {
            original_name: "usage.csv".to_string(),
            stored_name: "1_usage.csv".to_string(),
            path: path.clone(),
            size: 30,
            mime_type: "text/csv".to_string(),
            kind: AttachmentKind::Csv,
        };

        let summary = BasicDecoder.decode(&descriptor);
        assert!(summary.error.is_none());
        assert_eq!(summary.rows, Some(3));
        assert_eq!(summary.columns, vec!["instance", "cpu"]);
        assert_eq!(summary.column_stats.len(), 1);
        assert_eq!(summary.column_stats[0].column, "cpu");
        assert!((summary.column_stats[0].mean - 90.0).abs() < f64::EPSILON);
        assert!((summary.column_stats[0].max - 100.0).abs() < f64::EPSILON);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_basic_decoder_pdf_reports_error() {
        let descriptor = AttachmentDescriptor {
            original_name: "r.pdf".to_string(),
            stored_name: "1_r.pdf".to_string(),
            path: PathBuf::from("/nonexistent/r.pdf"),
            size: 10,
            mime_type: "application/pdf".to_string(),
            kind: AttachmentKind::Pdf,
        };
        let summary = BasicDecoder.decode(&descriptor);
        assert!(summary.error.is_some());
        assert_eq!(summary.kind, "pdf");
    }

    #[test]
    fn test_render_summaries_with_error() {
        let summaries = vec![AttachmentSummary {
            filename: "broken.xlsx".to_string(),
            kind: "excel".to_string(),
            error: Some("no decoder available for excel attachments".to_string()),
            ..AttachmentSummary::default()
        }];
        let md = render_attachment_summaries(&summaries);
        assert!(md.contains("#### broken.xlsx"));
        assert!(md.contains("decode failed"));
    }

    #[test]
    fn test_render_empty() {
        assert!(render_attachment_summaries(&[]).is_empty());
    }
}
