// RedRun - app/batch.rs
//
// Analyzes many inputs concurrently. Each input is read and analyzed on a
// rayon worker with the shared, read-only analyzer; results come back in
// input order. A failing input does not stop the others.

use crate::core::analyzer::Analyzer;
use crate::core::discovery::InputSource;
use crate::core::model::AnalysisResult;
use crate::platform::fs;
use crate::util::error::InputError;
use rayon::prelude::*;
use std::time::Instant;

/// Outcome of analyzing one input.
#[derive(Debug)]
pub struct InputReport {
    pub source: InputSource,
    pub outcome: Result<AnalysisResult, InputError>,
}

impl InputReport {
    pub fn name(&self) -> String {
        self.source.display_name()
    }
}

/// Aggregate over a whole batch.
#[derive(Debug)]
pub struct BatchReport {
    pub reports: Vec<InputReport>,
}

impl BatchReport {
    /// Number of inputs that could not be read.
    pub fn failures(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_err()).count()
    }

    /// Successful results paired with their source names, in input order.
    pub fn successes(&self) -> impl Iterator<Item = (String, &AnalysisResult)> + '_ {
        self.reports
            .iter()
            .filter_map(|r| r.outcome.as_ref().ok().map(|res| (r.name(), res)))
    }
}

/// Read the text of one input.
pub fn read_source(source: &InputSource) -> Result<String, InputError> {
    match source {
        InputSource::Stdin => fs::read_stdin_text(),
        InputSource::File(file) => fs::read_file_text(&file.path, file.is_large),
    }
}

/// Analyze every source, in parallel, preserving input order.
pub fn run_batch(sources: Vec<InputSource>, analyzer: &Analyzer) -> BatchReport {
    let started = Instant::now();
    tracing::debug!(
        inputs = sources.len(),
        rules = analyzer.catalog().len(),
        "Batch starting"
    );

    let reports: Vec<InputReport> = sources
        .into_par_iter()
        .map(|source| {
            let outcome = read_source(&source).map(|text| analyzer.analyze(&text));
            if let Err(ref e) = outcome {
                tracing::warn!(input = %source.display_name(), error = %e, "Input failed");
            }
            InputReport { source, outcome }
        })
        .collect();

    tracing::info!(
        inputs = reports.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Batch complete"
    );

    BatchReport { reports }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::discovery::InputFile;
    use crate::core::model::{AnalyzeOptions, Category};
    use crate::core::rules::{load_builtin_rules, RuleCatalog};
    use std::path::Path;

    fn analyzer() -> Analyzer {
        let catalog = RuleCatalog::new(load_builtin_rules().unwrap()).unwrap();
        Analyzer::new(catalog, AnalyzeOptions::default())
    }

    fn file_source(path: &Path) -> InputSource {
        InputSource::File(InputFile {
            path: path.to_path_buf(),
            size: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            modified: None,
            is_large: false,
        })
    }

    #[test]
    fn test_batch_preserves_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db.log");
        let clean = dir.path().join("clean.log");
        let binary = dir.path().join("blob.log");
        std::fs::write(&db, "ERROR: Connection refused to db-host:5432\n").unwrap();
        std::fs::write(&clean, "all good\n").unwrap();
        std::fs::write(&binary, b"\x00\x01\x02").unwrap();

        let batch = run_batch(
            vec![file_source(&db), file_source(&binary), file_source(&clean)],
            &analyzer(),
        );

        assert_eq!(batch.reports.len(), 3);
        assert_eq!(batch.failures(), 1);
        assert!(matches!(
            batch.reports[1].outcome,
            Err(InputError::NonText { .. })
        ));

        let first = batch.reports[0].outcome.as_ref().unwrap();
        assert_eq!(first.records[0].classification.category, Category::DatabaseError);
        assert!(batch.reports[2].outcome.as_ref().unwrap().is_clean());

        let names: Vec<String> = batch.successes().map(|(name, _)| name).collect();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("db.log"));
        assert!(names[1].ends_with("clean.log"));
    }

    #[test]
    fn test_batch_matches_sequential_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let text = "npm ERR! code E404\nnpm ERR! 404 Not Found - GET https://registry.npmjs.org/nope\n";
        let path = dir.path().join("npm.log");
        std::fs::write(&path, text).unwrap();

        let analyzer = analyzer();
        let batch = run_batch(vec![file_source(&path)], &analyzer);
        assert_eq!(
            batch.reports[0].outcome.as_ref().unwrap(),
            &analyzer.analyze(text)
        );
    }
}
