//! Persisted history log of daily aggregates.
//!
//! A flat JSON array, read wholesale and rewritten wholesale each run.
//! Insertion order is chronological order; trend windows are positional
//! suffixes, never re-sorted. A read failure degrades to "no history";
//! a write failure is logged but never fails the run that already
//! computed its report.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::DailyAggregate;
use crate::error::Result;

/// The on-disk history log.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Creates a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full history, oldest first.
    ///
    /// A missing or unreadable file degrades to an empty history with a
    /// warning; comparison and trends then report "no history available".
    #[must_use]
    pub fn load(&self) -> Vec<DailyAggregate> {
        if !self.path.exists() {
            return Vec::new();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(history) => history,
                Err(e) => {
                    warn!(error = %e, "history log unreadable, starting fresh");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to read history log");
                Vec::new()
            }
        }
    }

    /// Appends one aggregate and rewrites the whole log.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written; callers log it
    /// and continue, because the current run's report is already built.
    pub fn append(&self, aggregate: &DailyAggregate) -> Result<()> {
        let mut history = self.load();
        history.push(aggregate.clone());
        self.write(&history)
    }

    fn write(&self, history: &[DailyAggregate]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(history)?;
        std::fs::write(&self.path, json)?;
        info!(entries = history.len(), "history log saved");
        Ok(())
    }
}

/// Day-over-day comparison of the current aggregate against history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryComparison {
    /// Change in total message count vs. the previous run; 0 when no
    /// history is available.
    pub email_count_change: i64,
}

/// Compares the current aggregate against the last history entry.
#[must_use]
pub fn compare_with_history(
    history: &[DailyAggregate],
    current: &DailyAggregate,
) -> HistoryComparison {
    let email_count_change = history.last().map_or(0, |previous| {
        i64::try_from(current.total_emails).unwrap_or(i64::MAX)
            - i64::try_from(previous.total_emails).unwrap_or(i64::MAX)
    });

    HistoryComparison { email_count_change }
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
    use crate::aggregate::{DataPoint, DataPointKind, ImportanceCounts, UrgentItem};

    fn temp_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("maildigest-history-tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn sample_aggregate(total: usize) -> DailyAggregate {
        DailyAggregate {
            date: "2026-08-08".to_string(),
            total_emails: total,
            by_importance: ImportanceCounts {
                high: total,
                medium: 0,
                low: 0,
            },
            urgent_items: vec![UrgentItem {
                subject: "s".to_string(),
                summary: "sum".to_string(),
            }],
            data_points: vec![DataPoint {
                kind: DataPointKind::Percentage,
                value: 87.5,
                context: "cpu at 87.5%".to_string(),
            }],
            keywords: vec!["budget".to_string()],
            ..DailyAggregate::default()
        }
    }

    #[test]
    fn test_round_trip_equality() {
        let path = temp_file("roundtrip.json");
        std::fs::remove_file(&path).ok();

        let store = HistoryStore::new(&path);
        let aggregate = sample_aggregate(5);
        store.append(&aggregate).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], aggregate);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_append_preserves_order() {
        let path = temp_file("order.json");
        std::fs::remove_file(&path).ok();

        let store = HistoryStore::new(&path);
        store.append(&sample_aggregate(1)).unwrap();
        store.append(&sample_aggregate(2)).unwrap();
        store.append(&sample_aggregate(3)).unwrap();

        let totals: Vec<usize> = store.load().iter().map(|a| a.total_emails).collect();
        assert_eq!(totals, vec![1, 2, 3]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let store = HistoryStore::new(temp_file("never-written.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let path = temp_file("corrupt.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = HistoryStore::new(&path);
        assert!(store.load().is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_comparison_against_last_entry() {
        let history = vec![sample_aggregate(10), sample_aggregate(15)];
        let comparison = compare_with_history(&history, &sample_aggregate(12));
        assert_eq!(comparison.email_count_change, -3);
    }

    #[test]
    fn test_comparison_without_history() {
        let comparison = compare_with_history(&[], &sample_aggregate(12));
        assert_eq!(comparison.email_count_change, 0);
    }
}
