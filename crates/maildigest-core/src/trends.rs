//! Trend analysis over the history log.
//!
//! Four independent sub-analyses (volume, keywords, importance,
//! categories), each recomputed in full from the last `days` entries and
//! each nullable when the history is too short. All thresholds and band
//! orders are fixed; the volume ladder is intentionally asymmetric between
//! its positive and negative sides and must not be "fixed".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::DailyAggregate;
use crate::classify::Category;

/// Default trend window: last 7 history entries.
pub const DEFAULT_TREND_WINDOW: usize = 7;

/// Entries of the window counted as "recent" for the keyword trend.
const RECENT_KEYWORD_ENTRIES: usize = 3;

/// Positional suffix of the history, length at most `days`.
fn window(history: &[DailyAggregate], days: usize) -> &[DailyAggregate] {
    &history[history.len().saturating_sub(days)..]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

/// Volume trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    /// Change magnitude below 5%.
    Stable,
    /// Change above +20%.
    SignificantlyIncreasing,
    /// Change above +5%.
    Increasing,
    /// Change below -20%.
    SignificantlyDecreasing,
    /// Everything else on the negative side (and the +5% boundary).
    Decreasing,
}

impl VolumeTrend {
    /// Stable label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::SignificantlyIncreasing => "significantly_increasing",
            Self::Increasing => "increasing",
            Self::SignificantlyDecreasing => "significantly_decreasing",
            Self::Decreasing => "decreasing",
        }
    }
}

/// Classifies a signed change rate into the fixed volume bands.
///
/// Bands are evaluated in this exact order, first match wins. The ladder
/// is asymmetric: there is no intermediate negative band between -5% and
/// -20%, and the exact +5% boundary falls through to `Decreasing`.
#[must_use]
pub fn classify_volume(change_rate: f64) -> VolumeTrend {
    if change_rate.abs() < 5.0 {
        VolumeTrend::Stable
    } else if change_rate > 20.0 {
        VolumeTrend::SignificantlyIncreasing
    } else if change_rate > 5.0 {
        VolumeTrend::Increasing
    } else if change_rate < -20.0 {
        VolumeTrend::SignificantlyDecreasing
    } else {
        VolumeTrend::Decreasing
    }
}

/// Volume trend over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    /// Band classification of the latest change.
    pub trend: VolumeTrend,
    /// Percent change of the latest entry vs. the previous one; 0 when
    /// the previous total was 0.
    pub change_rate: f64,
    /// Raw totals the trend was computed from.
    pub recent_volumes: Vec<usize>,
}

/// Analyzes the email volume trend; `None` with fewer than 2 entries.
#[must_use]
pub fn analyze_volume(history: &[DailyAggregate], days: usize) -> Option<VolumeAnalysis> {
    if history.len() < 2 {
        return None;
    }

    let volumes: Vec<usize> = window(history, days)
        .iter()
        .map(|a| a.total_emails)
        .collect();
    if volumes.len() < 2 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let (latest, previous) = (
        volumes[volumes.len() - 1] as f64,
        volumes[volumes.len() - 2] as f64,
    );

    let change_rate = if previous > 0.0 {
        (latest - previous) / previous * 100.0
    } else {
        0.0
    };

    Some(VolumeAnalysis {
        trend: classify_volume(change_rate),
        change_rate,
        recent_volumes: volumes,
    })
}

/// Direction of a keyword's frequency change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordTrendKind {
    /// Recent frequency crossed 1.5x the previous frequency.
    Emerging,
    /// Recent frequency fell below 0.5x the previous frequency.
    Declining,
}

/// One keyword whose frequency crossed a trend threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTrend {
    /// The keyword.
    pub keyword: String,
    /// Occurrences in the recent sub-window.
    pub recent_count: usize,
    /// Occurrences in the previous sub-window.
    pub previous_count: usize,
    /// Crossed threshold.
    pub trend: KeywordTrendKind,
}

#[allow(clippy::cast_precision_loss)]
fn is_emerging(recent: usize, previous: usize) -> bool {
    recent as f64 > previous as f64 * 1.5 && recent >= 2
}

#[allow(clippy::cast_precision_loss)]
fn is_declining(recent: usize, previous: usize) -> bool {
    (recent as f64) < previous as f64 * 0.5 && previous >= 2
}

/// Computes keyword trends from per-window frequency counts: emerging
/// entries first, then declining ones.
#[must_use]
pub fn keyword_trends_from_counts(
    recent: &BTreeMap<String, usize>,
    previous: &BTreeMap<String, usize>,
) -> Vec<KeywordTrend> {
    let mut trends = Vec::new();

    for (keyword, &recent_count) in recent {
        let previous_count = previous.get(keyword).copied().unwrap_or(0);
        if is_emerging(recent_count, previous_count) {
            trends.push(KeywordTrend {
                keyword: keyword.clone(),
                recent_count,
                previous_count,
                trend: KeywordTrendKind::Emerging,
            });
        }
    }

    for (keyword, &previous_count) in previous {
        let recent_count = recent.get(keyword).copied().unwrap_or(0);
        if is_declining(recent_count, previous_count) {
            trends.push(KeywordTrend {
                keyword: keyword.clone(),
                recent_count,
                previous_count,
                trend: KeywordTrendKind::Declining,
            });
        }
    }

    trends
}

/// Analyzes keyword trends over the window: the last 3 entries form the
/// "recent" sub-window, everything else in range the "previous" one.
#[must_use]
pub fn analyze_keywords(history: &[DailyAggregate], days: usize) -> Vec<KeywordTrend> {
    if history.len() < 2 {
        return Vec::new();
    }

    let range = window(history, days);
    let split = range.len().saturating_sub(RECENT_KEYWORD_ENTRIES);
    let (previous_entries, recent_entries) = range.split_at(split);

    let count = |entries: &[DailyAggregate]| {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for entry in entries {
            for keyword in &entry.keywords {
                *counts.entry(keyword.clone()).or_default() += 1;
            }
        }
        counts
    };

    keyword_trends_from_counts(&count(recent_entries), &count(previous_entries))
}

/// Importance trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceTrend {
    /// Latest high-importance ratio above 1.2x the prior mean.
    IncreasingImportance,
    /// Latest ratio below 0.8x the prior mean.
    DecreasingImportance,
    /// Neither threshold crossed.
    StableImportance,
}

impl ImportanceTrend {
    /// Stable label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IncreasingImportance => "increasing_importance",
            Self::DecreasingImportance => "decreasing_importance",
            Self::StableImportance => "stable_importance",
        }
    }
}

/// Importance trend over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceAnalysis {
    /// Trend classification.
    pub trend: ImportanceTrend,
    /// Latest high-importance ratio, percent.
    pub latest_ratio: f64,
    /// Mean of all prior ratios in the window, percent.
    pub average_ratio: f64,
    /// The ratios the trend was computed from.
    pub ratios: Vec<f64>,
}

/// Analyzes the high-importance ratio trend; entries with zero importance
/// totals are skipped, and fewer than 2 usable ratios yields `None`.
#[must_use]
pub fn analyze_importance(history: &[DailyAggregate], days: usize) -> Option<ImportanceAnalysis> {
    if history.len() < 2 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let ratios: Vec<f64> = window(history, days)
        .iter()
        .filter(|a| a.by_importance.total() > 0)
        .map(|a| a.by_importance.high as f64 / a.by_importance.total() as f64 * 100.0)
        .collect();

    if ratios.len() < 2 {
        return None;
    }

    let latest_ratio = ratios[ratios.len() - 1];
    let average_ratio = mean(&ratios[..ratios.len() - 1]);

    let trend = if latest_ratio > average_ratio * 1.2 {
        ImportanceTrend::IncreasingImportance
    } else if latest_ratio < average_ratio * 0.8 {
        ImportanceTrend::DecreasingImportance
    } else {
        ImportanceTrend::StableImportance
    };

    Some(ImportanceAnalysis {
        trend,
        latest_ratio,
        average_ratio,
        ratios,
    })
}

/// Per-category trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryTrend {
    /// Latest count above 1.5x the prior mean.
    SignificantlyIncreasing,
    /// Latest count above 1.1x the prior mean.
    Increasing,
    /// Latest count below 0.5x the prior mean.
    SignificantlyDecreasing,
    /// Latest count below 0.9x the prior mean.
    Decreasing,
    /// Within the stable band.
    Stable,
}

impl CategoryTrend {
    /// Stable label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SignificantlyIncreasing => "significantly_increasing",
            Self::Increasing => "increasing",
            Self::SignificantlyDecreasing => "significantly_decreasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

/// Trend of one category's counts over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAnalysis {
    /// Band classification.
    pub trend: CategoryTrend,
    /// Latest count.
    pub latest_count: usize,
    /// Mean of all prior counts in the window.
    pub previous_average: f64,
    /// The counts the trend was computed from.
    pub counts: Vec<usize>,
}

/// Bands evaluated in fixed order: 1.5x, 1.1x, 0.5x, 0.9x, stable.
fn classify_category(latest: f64, previous_average: f64) -> CategoryTrend {
    if latest > previous_average * 1.5 {
        CategoryTrend::SignificantlyIncreasing
    } else if latest > previous_average * 1.1 {
        CategoryTrend::Increasing
    } else if latest < previous_average * 0.5 {
        CategoryTrend::SignificantlyDecreasing
    } else if latest < previous_average * 0.9 {
        CategoryTrend::Decreasing
    } else {
        CategoryTrend::Stable
    }
}

/// Analyzes each category's trend independently; empty with fewer than 2
/// history entries.
#[must_use]
pub fn analyze_categories(
    history: &[DailyAggregate],
    days: usize,
) -> BTreeMap<Category, CategoryAnalysis> {
    let mut trends = BTreeMap::new();
    if history.len() < 2 {
        return trends;
    }

    let range = window(history, days);
    for category in Category::ALL {
        let counts: Vec<usize> = range.iter().map(|a| a.by_category.get(category)).collect();
        if counts.len() < 2 {
            continue;
        }

        let latest_count = counts[counts.len() - 1];
        #[allow(clippy::cast_precision_loss)]
        let prior: Vec<f64> = counts[..counts.len() - 1]
            .iter()
            .map(|&c| c as f64)
            .collect();
        let previous_average = mean(&prior);

        #[allow(clippy::cast_precision_loss)]
        let trend = classify_category(latest_count as f64, previous_average);

        trends.insert(
            category,
            CategoryAnalysis {
                trend,
                latest_count,
                previous_average,
                counts,
            },
        );
    }

    trends
}

/// The four sub-analyses over one history window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    /// Volume trend; `None` when history is too short.
    pub volume: Option<VolumeAnalysis>,
    /// Emerging and declining keywords.
    pub keywords: Vec<KeywordTrend>,
    /// Importance trend; `None` when too few usable ratios exist.
    pub importance: Option<ImportanceAnalysis>,
    /// Per-category trends; empty when history is too short.
    pub categories: BTreeMap<Category, CategoryAnalysis>,
}

/// Runs all four sub-analyses over the last `days` entries.
#[must_use]
pub fn analyze_trends(history: &[DailyAggregate], days: usize) -> TrendAnalysis {
    TrendAnalysis {
        volume: analyze_volume(history, days),
        keywords: analyze_keywords(history, days),
        importance: analyze_importance(history, days),
        categories: analyze_categories(history, days),
    }
}

/// Derives short natural-language insights from the computed trends.
///
/// Pure selection/formatting over the four sub-analyses; no independent
/// logic.
#[must_use]
pub fn generate_insights(analysis: &TrendAnalysis) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(volume) = &analysis.volume {
        if volume.change_rate > 20.0 {
            insights.push(format!(
                "Email volume significantly increased (+{:.1}%), consider optimizing email management",
                volume.change_rate
            ));
        } else if volume.change_rate < -20.0 {
            insights.push(format!(
                "Email volume significantly decreased ({:.1}%), may reflect business activity changes",
                volume.change_rate
            ));
        }
    }

    if let Some(importance) = &analysis.importance {
        match importance.trend {
            ImportanceTrend::IncreasingImportance => insights.push(
                "High-importance email ratio increased, prioritize important items".to_string(),
            ),
            ImportanceTrend::DecreasingImportance => insights.push(
                "High-importance email ratio decreased, overall email pressure reduced".to_string(),
            ),
            ImportanceTrend::StableImportance => {}
        }
    }

    let emerging: Vec<&str> = analysis
        .keywords
        .iter()
        .filter(|k| k.trend == KeywordTrendKind::Emerging)
        .take(3)
        .map(|k| k.keyword.as_str())
        .collect();
    if !emerging.is_empty() {
        insights.push(format!(
            "Emerging keywords: {} - reflecting current focus areas",
            emerging.join(", ")
        ));
    }

    insights
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use crate::aggregate::{CategoryCounts, ImportanceCounts};
    use proptest::prelude::*;

    fn entry(total: usize) -> DailyAggregate {
        DailyAggregate {
            total_emails: total,
            ..DailyAggregate::default()
        }
    }

    fn entry_with_importance(high: usize, medium: usize, low: usize) -> DailyAggregate {
        DailyAggregate {
            total_emails: high + medium + low,
            by_importance: ImportanceCounts { high, medium, low },
            ..DailyAggregate::default()
        }
    }

    fn entry_with_keywords(keywords: &[&str]) -> DailyAggregate {
        DailyAggregate {
            keywords: keywords.iter().map(ToString::to_string).collect(),
            ..DailyAggregate::default()
        }
    }

    #[test]
    fn test_volume_scenario_a() {
        // 10 -> 15 is +50%, beyond the +20% band
        let history = vec![entry(10), entry(15)];
        let analysis = analyze_volume(&history, DEFAULT_TREND_WINDOW).unwrap();
        assert_eq!(analysis.change_rate, 50.0);
        assert_eq!(analysis.trend, VolumeTrend::SignificantlyIncreasing);
    }

    #[test]
    fn test_volume_scenario_b_boundary() {
        // 20 -> 19 is exactly -5%: NOT stable, falls through to decreasing
        let history = vec![entry(20), entry(19)];
        let analysis = analyze_volume(&history, DEFAULT_TREND_WINDOW).unwrap();
        assert_eq!(analysis.change_rate, -5.0);
        assert_eq!(analysis.trend, VolumeTrend::Decreasing);
    }

    #[test]
    fn test_volume_positive_boundary_asymmetry() {
        // Exactly +5% also falls through the positive bands to "decreasing";
        // the observed ladder is preserved, not fixed
        assert_eq!(classify_volume(5.0), VolumeTrend::Decreasing);
        assert_eq!(classify_volume(-5.0), VolumeTrend::Decreasing);
        assert_eq!(classify_volume(4.9), VolumeTrend::Stable);
        assert_eq!(classify_volume(-4.9), VolumeTrend::Stable);
        assert_eq!(classify_volume(20.1), VolumeTrend::SignificantlyIncreasing);
        assert_eq!(classify_volume(20.0), VolumeTrend::Increasing);
        assert_eq!(classify_volume(-20.0), VolumeTrend::Decreasing);
        assert_eq!(classify_volume(-20.1), VolumeTrend::SignificantlyDecreasing);
    }

    #[test]
    fn test_volume_zero_previous_is_zero_change() {
        let history = vec![entry(0), entry(50)];
        let analysis = analyze_volume(&history, DEFAULT_TREND_WINDOW).unwrap();
        assert_eq!(analysis.change_rate, 0.0);
        assert_eq!(analysis.trend, VolumeTrend::Stable);
    }

    #[test]
    fn test_volume_insufficient_history() {
        assert!(analyze_volume(&[entry(5)], DEFAULT_TREND_WINDOW).is_none());
        assert!(analyze_volume(&[], DEFAULT_TREND_WINDOW).is_none());
    }

    #[test]
    fn test_volume_window_is_positional_suffix() {
        let history: Vec<DailyAggregate> = (1..=10).map(entry).collect();
        let analysis = analyze_volume(&history, 7).unwrap();
        assert_eq!(analysis.recent_volumes, vec![4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_keyword_scenario_e() {
        let recent = BTreeMap::from([("ai".to_string(), 3)]);
        let previous = BTreeMap::from([("ai".to_string(), 1)]);
        let trends = keyword_trends_from_counts(&recent, &previous);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].trend, KeywordTrendKind::Emerging);
        assert_eq!(trends[0].recent_count, 3);
        assert_eq!(trends[0].previous_count, 1);

        let trends = keyword_trends_from_counts(&previous, &recent);
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].trend, KeywordTrendKind::Declining);
        assert_eq!(trends[0].recent_count, 1);
        assert_eq!(trends[0].previous_count, 3);
    }

    #[test]
    fn test_keyword_windows_split_last_three() {
        // 5 entries: first two are "previous", last three "recent"
        let history = vec![
            entry_with_keywords(&["budget", "budget"]),
            entry_with_keywords(&["budget"]),
            entry_with_keywords(&["ai"]),
            entry_with_keywords(&["ai"]),
            entry_with_keywords(&["ai"]),
        ];
        let trends = analyze_keywords(&history, DEFAULT_TREND_WINDOW);

        let ai = trends.iter().find(|t| t.keyword == "ai").unwrap();
        assert_eq!(ai.trend, KeywordTrendKind::Emerging);
        assert_eq!(ai.recent_count, 3);

        let budget = trends.iter().find(|t| t.keyword == "budget").unwrap();
        assert_eq!(budget.trend, KeywordTrendKind::Declining);
        assert_eq!(budget.previous_count, 3);
        assert_eq!(budget.recent_count, 0);
    }

    #[test]
    fn test_keyword_emerging_ordered_before_declining() {
        let recent = BTreeMap::from([("zz".to_string(), 4)]);
        let previous = BTreeMap::from([("aa".to_string(), 4)]);
        let trends = keyword_trends_from_counts(&recent, &previous);
        assert_eq!(trends[0].trend, KeywordTrendKind::Emerging);
        assert_eq!(trends[1].trend, KeywordTrendKind::Declining);
    }

    #[test]
    fn test_importance_increasing() {
        let history = vec![
            entry_with_importance(1, 5, 4), // 10%
            entry_with_importance(1, 5, 4), // 10%
            entry_with_importance(5, 3, 2), // 50%
        ];
        let analysis = analyze_importance(&history, DEFAULT_TREND_WINDOW).unwrap();
        assert_eq!(analysis.trend, ImportanceTrend::IncreasingImportance);
        assert_eq!(analysis.latest_ratio, 50.0);
        assert_eq!(analysis.average_ratio, 10.0);
    }

    #[test]
    fn test_importance_zero_total_entries_skipped() {
        let history = vec![
            entry_with_importance(2, 2, 0), // 50%
            entry(0),                       // skipped, not zero
            entry_with_importance(3, 3, 0), // 50%
        ];
        let analysis = analyze_importance(&history, DEFAULT_TREND_WINDOW).unwrap();
        assert_eq!(analysis.ratios.len(), 2);
        assert_eq!(analysis.trend, ImportanceTrend::StableImportance);
    }

    #[test]
    fn test_importance_insufficient_ratios() {
        let history = vec![entry_with_importance(1, 1, 0), entry(0)];
        assert!(analyze_importance(&history, DEFAULT_TREND_WINDOW).is_none());
    }

    #[test]
    fn test_category_bands_in_order() {
        assert_eq!(classify_category(16.0, 10.0), CategoryTrend::SignificantlyIncreasing);
        assert_eq!(classify_category(12.0, 10.0), CategoryTrend::Increasing);
        assert_eq!(classify_category(4.0, 10.0), CategoryTrend::SignificantlyDecreasing);
        assert_eq!(classify_category(8.0, 10.0), CategoryTrend::Decreasing);
        assert_eq!(classify_category(10.0, 10.0), CategoryTrend::Stable);
    }

    #[test]
    fn test_category_analysis_per_category() {
        let a = DailyAggregate {
            total_emails: 7,
            by_category: CategoryCounts {
                decisions: 2,
                updates: 4,
                alerts: 0,
                general: 1,
            },
            ..DailyAggregate::default()
        };

        let b = DailyAggregate {
            total_emails: 8,
            by_category: CategoryCounts {
                decisions: 4,
                updates: 4,
                alerts: 0,
                general: 0,
            },
            ..DailyAggregate::default()
        };

        let trends = analyze_categories(&[a, b], DEFAULT_TREND_WINDOW);
        assert_eq!(
            trends[&Category::Decisions].trend,
            CategoryTrend::SignificantlyIncreasing
        );
        assert_eq!(trends[&Category::Updates].trend, CategoryTrend::Stable);
        assert_eq!(trends[&Category::Alerts].trend, CategoryTrend::Stable);
        assert_eq!(
            trends[&Category::General].trend,
            CategoryTrend::SignificantlyDecreasing
        );
    }

    #[test]
    fn test_insights_thresholds() {
        let history = vec![entry(10), entry(15)];
        let analysis = analyze_trends(&history, DEFAULT_TREND_WINDOW);
        let insights = generate_insights(&analysis);
        assert!(insights.iter().any(|i| i.contains("+50.0%")));
    }

    #[test]
    fn test_insights_empty_when_all_stable() {
        let history = vec![entry(10), entry(10)];
        let analysis = analyze_trends(&history, DEFAULT_TREND_WINDOW);
        assert!(generate_insights(&analysis).is_empty());
    }

    proptest! {
        #[test]
        fn prop_zero_previous_means_zero_change(latest in 0usize..10_000) {
            let history = vec![entry(0), entry(latest)];
            let analysis = analyze_volume(&history, DEFAULT_TREND_WINDOW).unwrap();
            prop_assert_eq!(analysis.change_rate, 0.0);
        }

        #[test]
        fn prop_volume_classification_idempotent(rate in -500.0f64..500.0) {
            prop_assert_eq!(classify_volume(rate), classify_volume(rate));
        }

        #[test]
        fn prop_emerging_monotonic_in_recent_count(
            recent in 0usize..1_000,
            previous in 0usize..1_000,
            bump in 0usize..1_000,
        ) {
            // Raising the recent count never demotes an emerging keyword
            if is_emerging(recent, previous) {
                prop_assert!(is_emerging(recent + bump, previous));
            }
        }
    }
}
