// RedRun - core/aggregate.rs
//
// Final aggregation: totals and per-category breakdown.

use crate::core::grouper::Grouped;
use crate::core::model::{AnalysisResult, Category};
use std::collections::BTreeMap;

/// Build the immutable `AnalysisResult` from pipeline counts and grouped
/// records. The category breakdown counts records, not occurrences.
pub fn aggregate(total_lines: usize, signals_detected: usize, grouped: Grouped) -> AnalysisResult {
    let Grouped {
        records,
        noise_filtered,
    } = grouped;

    let errors_extracted = records.iter().map(|r| r.occurrence_count).sum();

    let mut category_breakdown: BTreeMap<Category, usize> = BTreeMap::new();
    for record in &records {
        *category_breakdown
            .entry(record.classification.category)
            .or_insert(0) += 1;
    }

    tracing::debug!(
        total_lines,
        signals_detected,
        errors_extracted,
        noise_filtered,
        categories = category_breakdown.len(),
        "Aggregation complete"
    );

    AnalysisResult {
        total_lines,
        signals_detected,
        errors_extracted,
        noise_filtered,
        records,
        category_breakdown,
    }
}
