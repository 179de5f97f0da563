//! Quality scoring and hotspot ranking.
//!
//! Reduces a file's structural elements to aggregate metrics, a 0-100
//! quality score, and an unbounded hotspot score used only for ranking.
//!
//! Quality = clamp(100 - P_complexity - P_length - P_long - P_nest, 0, 100)
//! where each penalty is capped by its `PenaltySpec`.

use serde::{Deserialize, Serialize};

use crate::analysis::StructuralElement;
use crate::config::ScoreConfig;
use crate::lines::LineCounts;

/// Number of hotspot records kept per scan.
pub const HOTSPOT_LIMIT: usize = 10;

/// Complexity aggregates over a file's callable elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityStats {
    pub avg: f64,
    pub max: u32,
    pub min: u32,
}

/// Element counts for a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    pub functions: usize,
    pub classes: usize,
    pub imports: usize,
}

/// Quality score plus the elements that dragged it down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualitySummary {
    /// 0-100, higher is better.
    pub score: f64,
    /// Names of elements longer than the configured threshold.
    pub long_functions: Vec<String>,
    /// Names of elements nested deeper than the configured threshold.
    pub deep_nesting: Vec<String>,
}

/// Aggregate metrics for one file. Fully recomputed on each scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub file: String,
    pub lines: LineCounts,
    pub counts: ElementCounts,
    pub complexity: ComplexityStats,
    pub quality: QualitySummary,
}

/// A file summary plus its hotspot score. Recomputed per scan, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotRecord {
    pub summary: FileSummary,
    pub hotspot_score: f64,
}

/// Compute the quality summary for one file.
///
/// Averages, ratios, and penalties cover the callable elements (functions
/// and methods); classes contribute only to the counts.
pub fn score(
    file: &str,
    elements: &[StructuralElement],
    lines: LineCounts,
    import_count: usize,
    config: &ScoreConfig,
) -> FileSummary {
    let callables: Vec<&StructuralElement> =
        elements.iter().filter(|e| e.kind.is_callable()).collect();
    let classes = elements.len() - callables.len();

    let counts = ElementCounts {
        functions: callables.len(),
        classes,
        imports: import_count,
    };

    if callables.is_empty() {
        return FileSummary {
            file: file.to_string(),
            lines,
            counts,
            complexity: ComplexityStats::default(),
            quality: QualitySummary {
                score: 100.0,
                ..Default::default()
            },
        };
    }

    let total = callables.len() as f64;
    let avg_complexity =
        callables.iter().map(|e| e.complexity as f64).sum::<f64>() / total;
    let max = callables.iter().map(|e| e.complexity).max().unwrap_or(0);
    let min = callables.iter().map(|e| e.complexity).min().unwrap_or(0);
    let avg_length = callables.iter().map(|e| e.line_count as f64).sum::<f64>() / total;

    let long_functions: Vec<String> = callables
        .iter()
        .filter(|e| e.line_count > config.long_element_lines)
        .map(|e| e.name.clone())
        .collect();
    let deep_nesting: Vec<String> = callables
        .iter()
        .filter(|e| e.nesting_depth > config.deep_nesting_depth)
        .map(|e| e.name.clone())
        .collect();

    let p_complexity = ((avg_complexity - config.complexity_target).max(0.0)
        * config.complexity_penalty.factor)
        .min(config.complexity_penalty.cap);
    let p_length = ((avg_length - config.length_target).max(0.0) / config.length_penalty.factor)
        .min(config.length_penalty.cap);
    let p_long = (long_functions.len() as f64 / total * config.long_ratio_penalty.factor)
        .min(config.long_ratio_penalty.cap);
    let p_nest = (deep_nesting.len() as f64 / total * config.nesting_ratio_penalty.factor)
        .min(config.nesting_ratio_penalty.cap);

    let quality_score = (100.0 - p_complexity - p_length - p_long - p_nest).clamp(0.0, 100.0);

    FileSummary {
        file: file.to_string(),
        lines,
        counts,
        complexity: ComplexityStats {
            avg: avg_complexity,
            max,
            min,
        },
        quality: QualitySummary {
            score: quality_score,
            long_functions,
            deep_nesting,
        },
    }
}

/// Hotspot score for a file. Unbounded; only the relative ordering matters.
pub fn hotspot_score(summary: &FileSummary) -> f64 {
    let quality_term = ((70.0 - summary.quality.score) / 10.0).max(0.0);
    let complexity_term = (summary.complexity.avg - 10.0).max(0.0);
    quality_term
        + complexity_term
        + 5.0 * summary.quality.long_functions.len() as f64
        + 3.0 * summary.quality.deep_nesting.len() as f64
}

/// Rank file summaries by hotspot score, descending, truncated to the top
/// ten. Ties break on path for deterministic output.
pub fn rank_hotspots(summaries: &[FileSummary]) -> Vec<HotspotRecord> {
    let mut records: Vec<HotspotRecord> = summaries
        .iter()
        .map(|s| HotspotRecord {
            summary: s.clone(),
            hotspot_score: hotspot_score(s),
        })
        .collect();

    records.sort_by(|a, b| {
        b.hotspot_score
            .partial_cmp(&a.hotspot_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.summary.file.cmp(&b.summary.file))
    });
    records.truncate(HOTSPOT_LIMIT);
    records
}
