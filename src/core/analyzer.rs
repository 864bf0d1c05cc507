// RedRun - core/analyzer.rs
//
// Pipeline entry point: raw text -> normalise -> detect -> classify ->
// group -> aggregate. Synchronous, single-threaded, infallible.

use crate::core::aggregate::aggregate;
use crate::core::detector::{self, DetectorConfig};
use crate::core::engine::{PreviewLimits, RuleEngine};
use crate::core::grouper;
use crate::core::model::{AnalysisResult, AnalyzeOptions};
use crate::core::normalizer;
use crate::core::rules::RuleCatalog;

/// Run the full pipeline over `raw_text`.
///
/// Empty input yields a valid empty result. The catalog is only read, so
/// one catalog can serve any number of concurrent calls.
pub fn analyze(raw_text: &str, catalog: &RuleCatalog, options: &AnalyzeOptions) -> AnalysisResult {
    let span = tracing::debug_span!("analyze", bytes = raw_text.len());
    let _guard = span.enter();

    let lines = normalizer::normalize(raw_text);

    let signals = detector::detect(
        &lines,
        &DetectorConfig {
            max_signal_lines: options.max_signal_lines,
        },
    );

    let engine = RuleEngine::new(
        catalog,
        PreviewLimits {
            max_chars: options.preview_max_chars,
            max_lines: options.preview_max_lines,
        },
    );
    let classifications = engine.classify_all(&signals);

    let grouped = grouper::group(&signals, &classifications, options.noise_threshold);

    aggregate(lines.len(), signals.len(), grouped)
}

/// A catalog bundled with its analysis options.
#[derive(Debug, Clone)]
pub struct Analyzer {
    catalog: RuleCatalog,
    options: AnalyzeOptions,
}

impl Analyzer {
    pub fn new(catalog: RuleCatalog, options: AnalyzeOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn analyze(&self, raw_text: &str) -> AnalysisResult {
        analyze(raw_text, &self.catalog, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Category, Severity};
    use crate::core::rules::load_builtin_rules;

    fn analyzer() -> Analyzer {
        let catalog = RuleCatalog::new(load_builtin_rules().unwrap()).unwrap();
        Analyzer::new(catalog, AnalyzeOptions::default())
    }

    const MIXED_LOG: &str = "\
2024-01-15 10:30:00 INFO Starting build
2024-01-15 10:30:01 DEBUG Resolving deps
ERROR: Connection refused to db-host:5432
ERROR: Connection refused to db-host:5432
Running tests...
FAILED tests/test_api.py::test_login - AssertionError: expected 200 but got 401
ERROR: something odd happened
Error: Process completed with exit code 1.
";

    #[test]
    fn test_empty_input_is_valid_empty_result() {
        let result = analyzer().analyze("");
        assert_eq!(result.total_lines, 0);
        assert_eq!(result.signals_detected, 0);
        assert!(result.is_clean());
    }

    #[test]
    fn test_db_connection_refused_scenario() {
        let result = analyzer().analyze("ERROR: Connection refused to db-host:5432\n");
        assert_eq!(result.records.len(), 1);
        let rec = &result.records[0];
        assert_eq!(rec.classification.category, Category::DatabaseError);
        assert_eq!(rec.classification.confidence, 90);
        assert_eq!(rec.signal.severity, Severity::Error);
        assert_eq!(rec.signal.start_line, 1);
    }

    #[test]
    fn test_all_noise_log() {
        let log = "INFO starting\nDEBUG tick\nINFO retrying after error\nall good\n";
        let result = analyzer().analyze(log);
        assert_eq!(result.total_lines, 4);
        assert_eq!(result.signals_detected, 0);
        assert_eq!(result.errors_extracted, 0);
        assert!(result.is_clean());
    }

    #[test]
    fn test_conservation_and_breakdown() {
        let result = analyzer().analyze(MIXED_LOG);
        assert_eq!(result.total_lines, 8);
        assert_eq!(
            result.errors_extracted + result.noise_filtered,
            result.signals_detected
        );
        assert_eq!(
            result.errors_extracted,
            result.records.iter().map(|r| r.occurrence_count).sum::<usize>()
        );
        assert_eq!(
            result.category_breakdown.values().sum::<usize>(),
            result.records.len()
        );
        // The duplicate db line folds; the odd line is noise.
        assert_eq!(result.noise_filtered, 1);
        let db = &result.records[0];
        assert_eq!(db.classification.category, Category::DatabaseError);
        assert_eq!(db.occurrence_lines, vec![3, 4]);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let a = analyzer();
        let first = a.analyze(MIXED_LOG);
        for _ in 0..3 {
            assert_eq!(a.analyze(MIXED_LOG), first);
        }
    }

    #[test]
    fn test_every_record_has_a_closed_category() {
        let result = analyzer().analyze(MIXED_LOG);
        for rec in &result.records {
            assert!(Category::all().contains(&rec.classification.category));
            assert!(rec.classification.confidence <= 100);
        }
    }

    #[test]
    fn test_noise_threshold_zero_keeps_unmatched() {
        let catalog = RuleCatalog::new(load_builtin_rules().unwrap()).unwrap();
        let options = AnalyzeOptions {
            noise_threshold: 0,
            ..AnalyzeOptions::default()
        };
        let result = analyze("ERROR: something odd\n", &catalog, &options);
        assert_eq!(result.noise_filtered, 0);
        assert_eq!(result.records.len(), 1);
    }
}
