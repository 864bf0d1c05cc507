// RedRun - tests/e2e_analyze.rs
//
// End-to-end tests for the analysis pipeline.
//
// These tests exercise real fixture logs on disk, the embedded rule
// catalog, real rule files written to temp directories, real walkdir and
// glob expansion, and the rayon batch runner. No mocks, no stubs.

use redrun::app::batch::{self, read_source};
use redrun::app::rule_mgr::{self, RuleSources};
use redrun::core::analyzer::Analyzer;
use redrun::core::discovery::{expand_inputs, DiscoveryConfig, InputSource};
use redrun::core::export::{export_csv, export_json, SourceReport};
use redrun::core::model::{AnalysisResult, AnalyzeOptions, Category, Severity};
use redrun::core::rules::RuleCatalog;
use redrun::ui::console;
use redrun::util::error::{InputError, RuleError};
use std::fs;
use std::path::{Path, PathBuf};

// =============================================================================
// Helpers
// =============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

fn builtin_catalog() -> RuleCatalog {
    rule_mgr::load_catalog(&RuleSources {
        builtin: true,
        ..Default::default()
    })
    .expect("built-in catalog must load")
}

fn analyze_fixture(name: &str, catalog: RuleCatalog) -> AnalysisResult {
    let text = fs::read_to_string(fixture(name)).unwrap();
    Analyzer::new(catalog, AnalyzeOptions::default()).analyze(&text)
}

fn assert_conserved(result: &AnalysisResult) {
    let occurrences: usize = result.records.iter().map(|r| r.occurrence_count).sum();
    assert_eq!(result.errors_extracted, occurrences);
    assert_eq!(
        result.errors_extracted + result.noise_filtered,
        result.signals_detected
    );
}

// =============================================================================
// Scenarios
// =============================================================================

/// A Java exception with its frames and "... N more" is one Database Error.
#[test]
fn e2e_java_stack_trace_is_one_signal() {
    let result = analyze_fixture("java_trace.log", builtin_catalog());

    assert_eq!(result.total_lines, 10);
    assert_eq!(result.signals_detected, 2);
    assert_eq!(result.noise_filtered, 0);
    assert_eq!(result.records.len(), 2);
    assert_conserved(&result);

    let db = &result.records[0];
    assert_eq!(db.signal.start_line, 3);
    assert_eq!(db.signal.end_line, 8);
    assert_eq!(db.signal.severity, Severity::Error);
    assert!(db.signal.raw_text.contains("... 42 more"));
    assert_eq!(db.classification.category, Category::DatabaseError);
    assert_eq!(
        db.classification.matched_rule_id.as_deref(),
        Some("db-sql-exception")
    );
    assert_eq!(db.classification.confidence, 90);

    let tests = &result.records[1];
    assert_eq!(tests.signal.start_line, 10);
    assert_eq!(tests.classification.category, Category::TestFailure);
    assert_eq!(
        tests.classification.matched_rule_id.as_deref(),
        Some("test-framework-failure")
    );
}

/// A Python traceback folds through its frames to the exception line.
#[test]
fn e2e_python_traceback_is_configuration_error() {
    let result = analyze_fixture("python_traceback.log", builtin_catalog());

    assert_eq!(result.total_lines, 13);
    assert_eq!(result.signals_detected, 3);
    assert_eq!(result.records.len(), 3);
    assert_conserved(&result);

    let traceback = &result.records[0];
    assert_eq!(traceback.signal.start_line, 5);
    assert_eq!(traceback.signal.end_line, 10);
    assert_eq!(
        traceback.classification.category,
        Category::ConfigurationError
    );
    assert_eq!(
        traceback.classification.matched_rule_id.as_deref(),
        Some("config-missing")
    );

    assert_eq!(result.records[1].classification.category, Category::TestFailure);
    assert_eq!(result.records[2].classification.category, Category::Other);
    assert_eq!(
        result.records[2].classification.matched_rule_id.as_deref(),
        Some("other-exit-code")
    );
}

/// Repeated connection-refused lines collapse into one record.
#[test]
fn e2e_connection_refused_grouped() {
    let result = analyze_fixture("db_refused.log", builtin_catalog());

    assert_eq!(result.total_lines, 4);
    assert_eq!(result.signals_detected, 2);
    assert_eq!(result.errors_extracted, 2);
    assert_eq!(result.records.len(), 1);

    let record = &result.records[0];
    assert_eq!(record.classification.category, Category::DatabaseError);
    assert_eq!(record.classification.confidence, 90);
    assert_eq!(record.occurrence_count, 2);
    assert_eq!(record.occurrence_lines, vec![2, 4]);
    assert_eq!(result.category_breakdown.get(&Category::DatabaseError), Some(&1));
}

/// Unmatched, low-confidence signals are noise; quiet levels never trigger.
#[test]
fn e2e_all_noise_log_is_clean() {
    let result = analyze_fixture("all_noise.log", builtin_catalog());

    assert_eq!(result.total_lines, 8);
    assert_eq!(result.signals_detected, 2);
    assert_eq!(result.noise_filtered, 2);
    assert!(result.is_clean());
    assert!(result.category_breakdown.is_empty());

    let mut buf = Vec::new();
    console::render_result(&mut buf, &result, false).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap().trim(),
        "No errors found in log file."
    );
}

/// Lowering the threshold to zero keeps every signal.
#[test]
fn e2e_zero_noise_threshold_keeps_unmatched_signals() {
    let text = fs::read_to_string(fixture("all_noise.log")).unwrap();
    let options = AnalyzeOptions {
        noise_threshold: 0,
        ..AnalyzeOptions::default()
    };
    let result = Analyzer::new(builtin_catalog(), options).analyze(&text);
    assert_eq!(result.noise_filtered, 0);
    assert_eq!(result.records.len(), 2);
    assert!(result
        .records
        .iter()
        .all(|r| r.classification.matched_rule_id.is_none()));
    assert_eq!(result.records[1].signal.severity, Severity::Warn);
}

/// CI output with ANSI colour codes and CRLF endings classifies the same as
/// plain text.
#[test]
fn e2e_ansi_and_crlf_are_transparent() {
    let plain = "ERROR: Connection refused to db-host:5432\nok\n";
    let coloured = "\x1b[31mERROR:\x1b[0m Connection refused to db-host:5432\r\nok\r\n";
    let analyzer = Analyzer::new(builtin_catalog(), AnalyzeOptions::default());
    assert_eq!(analyzer.analyze(plain), analyzer.analyze(coloured));
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn e2e_analysis_is_deterministic() {
    let text = fs::read_to_string(fixture("python_traceback.log")).unwrap();
    let analyzer = Analyzer::new(builtin_catalog(), AnalyzeOptions::default());
    let first = analyzer.analyze(&text);
    for _ in 0..5 {
        assert_eq!(analyzer.analyze(&text), first);
    }
}

/// Two concatenated copies of a log fold into the same records with every
/// occurrence count doubled.
#[test]
fn e2e_doubled_log_doubles_occurrences() {
    let analyzer = Analyzer::new(builtin_catalog(), AnalyzeOptions::default());
    for name in [
        "java_trace.log",
        "python_traceback.log",
        "db_refused.log",
        "all_noise.log",
    ] {
        let text = fs::read_to_string(fixture(name)).unwrap();
        let single = analyzer.analyze(&text);
        let doubled = analyzer.analyze(&format!("{text}{text}"));

        let categories = |r: &AnalysisResult| {
            r.records
                .iter()
                .map(|rec| rec.classification.category)
                .collect::<Vec<_>>()
        };
        assert_eq!(categories(&doubled), categories(&single), "{name}");
        for (d, s) in doubled.records.iter().zip(&single.records) {
            assert_eq!(d.occurrence_count, 2 * s.occurrence_count, "{name}");
            assert_eq!(d.classification, s.classification, "{name}");
        }
        assert_eq!(
            doubled.category_breakdown.keys().collect::<Vec<_>>(),
            single.category_breakdown.keys().collect::<Vec<_>>(),
            "{name}"
        );
        assert_eq!(doubled.signals_detected, 2 * single.signals_detected, "{name}");
        assert_eq!(doubled.noise_filtered, 2 * single.noise_filtered, "{name}");
        assert_conserved(&doubled);
    }
}

#[test]
fn e2e_empty_input_is_empty_result() {
    let result = Analyzer::new(builtin_catalog(), AnalyzeOptions::default()).analyze("");
    assert_eq!(result.total_lines, 0);
    assert_eq!(result.signals_detected, 0);
    assert!(result.is_clean());
}

// =============================================================================
// Rule catalog management
// =============================================================================

/// A user rule with a built-in id replaces it; the change shows in results.
#[test]
fn e2e_user_rule_overrides_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("team.toml");
    fs::write(
        &rules,
        r#"
[[rule]]
id = "db-sql-exception"
category = "infrastructure-timeout"
pattern = 'org\.postgresql'
priority = 90
confidence = 70
description = "Our CI database is flaky; treat as infra"
"#,
    )
    .unwrap();

    let catalog = rule_mgr::load_catalog(&RuleSources {
        builtin: true,
        auto_dir: None,
        explicit: Some(rules),
    })
    .unwrap();

    let result = analyze_fixture("java_trace.log", catalog);
    let record = &result.records[0];
    assert_eq!(
        record.classification.category,
        Category::InfrastructureTimeout
    );
    assert_eq!(record.classification.confidence, 70);
}

/// Without built-ins, only user rules classify; everything else is noise.
#[test]
fn e2e_no_builtin_rules() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("only.toml"),
        r#"
[[rule]]
id = "refused"
category = "Network Error"
pattern = 'connection\s+refused'
priority = 10
confidence = 50
"#,
    )
    .unwrap();

    let catalog = rule_mgr::load_catalog(&RuleSources {
        builtin: false,
        auto_dir: Some(dir.path().to_path_buf()),
        explicit: None,
    })
    .unwrap();
    assert_eq!(catalog.len(), 1);

    let result = analyze_fixture("db_refused.log", catalog);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].classification.category, Category::NetworkError);
}

/// A malformed rule is reported with its id and file, never dropped.
#[test]
fn e2e_invalid_rule_file_names_rule_and_path() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("broken.toml");
    fs::write(
        &rules,
        r#"
[[rule]]
id = "missing-pattern"
category = "Build Error"
priority = 50
confidence = 50
"#,
    )
    .unwrap();

    let err = rule_mgr::check_rules(&rules).unwrap_err();
    match &err {
        RuleError::MissingField { rule, field, .. } => {
            assert_eq!(rule, "missing-pattern");
            assert_eq!(*field, "pattern");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("broken.toml"), "{message}");
    assert!(message.contains("missing-pattern"), "{message}");
}

#[test]
fn e2e_unknown_category_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("cat.toml");
    fs::write(
        &rules,
        "[[rule]]\nid = \"k\"\ncategory = \"Kernel Panic\"\npattern = \"panic\"\npriority = 1\nconfidence = 1\n",
    )
    .unwrap();
    let err = rule_mgr::check_rules(&rules).unwrap_err();
    assert!(matches!(err, RuleError::UnknownCategory { .. }));
}

// =============================================================================
// Discovery and batch
// =============================================================================

#[test]
fn e2e_directory_discovery_finds_fixture_logs() {
    let args = vec![fixtures_dir().display().to_string()];
    let expansion = expand_inputs(&args, &DiscoveryConfig::default()).unwrap();
    assert!(expansion.warnings.is_empty(), "{:?}", expansion.warnings);

    let names: Vec<String> = expansion
        .sources
        .iter()
        .map(|s| match s {
            InputSource::File(f) => f.path.file_name().unwrap().to_string_lossy().into_owned(),
            InputSource::Stdin => panic!("unexpected stdin source"),
        })
        .collect();
    assert_eq!(
        names,
        vec![
            "all_noise.log",
            "db_refused.log",
            "java_trace.log",
            "python_traceback.log"
        ]
    );
}

#[test]
fn e2e_glob_input_expansion() {
    let pattern = fixtures_dir().join("*_refused.log").display().to_string();
    let expansion = expand_inputs(&[pattern], &DiscoveryConfig::default()).unwrap();
    assert_eq!(expansion.sources.len(), 1);
    assert!(expansion.sources[0].display_name().ends_with("db_refused.log"));
}

#[test]
fn e2e_missing_input_is_an_error() {
    let missing = fixture("does_not_exist.log").display().to_string();
    let err = expand_inputs(&[missing], &DiscoveryConfig::default()).unwrap_err();
    assert!(matches!(err, InputError::NotFound { .. }));
}

#[test]
fn e2e_batch_over_fixture_directory() {
    let args = vec![fixtures_dir().display().to_string()];
    let expansion = expand_inputs(&args, &DiscoveryConfig::default()).unwrap();
    let analyzer = Analyzer::new(builtin_catalog(), AnalyzeOptions::default());

    let report = batch::run_batch(expansion.sources.clone(), &analyzer);
    assert_eq!(report.failures(), 0);
    assert_eq!(report.reports.len(), 4);

    for (input, source) in report.reports.iter().zip(&expansion.sources) {
        let result = input.outcome.as_ref().unwrap();
        assert_conserved(result);
        // Parallel results equal a sequential run over the same input.
        let text = read_source(source).unwrap();
        assert_eq!(result, &analyzer.analyze(&text));
    }
}

// =============================================================================
// Export
// =============================================================================

fn fixture_reports(catalog: &RuleCatalog) -> Vec<(String, AnalysisResult)> {
    ["db_refused.log", "java_trace.log"]
        .iter()
        .map(|name| {
            let text = fs::read_to_string(fixture(name)).unwrap();
            let result =
                redrun::core::analyzer::analyze(&text, catalog, &AnalyzeOptions::default());
            ((*name).to_string(), result)
        })
        .collect()
}

#[test]
fn e2e_json_export() {
    let catalog = builtin_catalog();
    let owned = fixture_reports(&catalog);
    let reports: Vec<SourceReport<'_>> = owned
        .iter()
        .map(|(source, result)| SourceReport { source, result })
        .collect();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.json");
    let file = fs::File::create(&out).unwrap();
    export_json(&reports, file, &out).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let array = value.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(array[0]["source"], "db_refused.log");
    assert_eq!(array[0]["records"][0]["occurrence_lines"], serde_json::json!([2, 4]));
    assert_eq!(array[1]["records"][0]["signal"]["end_line"], 8);
    assert_eq!(array[1]["records"][0]["signal"]["severity"], "ERROR");
}

#[test]
fn e2e_csv_export() {
    let catalog = builtin_catalog();
    let owned = fixture_reports(&catalog);
    let reports: Vec<SourceReport<'_>> = owned
        .iter()
        .map(|(source, result)| SourceReport { source, result })
        .collect();

    let mut buf = Vec::new();
    let rows = export_csv(&reports, &mut buf, Path::new("report.csv")).unwrap();
    assert_eq!(rows, 3);

    let mut reader = csv::Reader::from_reader(buf.as_slice());
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 3);
    assert_eq!(&records[0][0], "db_refused.log");
    assert_eq!(&records[0][8], "2;4");
    assert_eq!(&records[1][0], "java_trace.log");
    assert_eq!(&records[1][5], "Database Error");
    // Multi-line previews survive quoting.
    assert!(records[1][10].contains('\n'));
}
