// RedRun - ui/console.rs
//
// Terminal renderer. Writes the plain-text report for one analyzed input:
// banner, failure summary, category breakdown and (unless summary-only)
// the detailed error listing. Also renders the rule catalog listing.
//
// Pure formatting over `Write`; no analysis happens here.

use crate::core::discovery::InputFile;
use crate::core::model::{AnalysisResult, ErrorRecord};
use crate::core::rules::RuleCatalog;
use crate::util::constants::{self, REPORT_WIDTH};
use std::io::{self, Write};

const NO_ERRORS: &str = "No errors found in log file.";

fn heavy_rule<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(REPORT_WIDTH))
}

fn light_rule<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(REPORT_WIDTH))
}

/// Boxed name banner.
pub fn render_banner<W: Write>(out: &mut W) -> io::Result<()> {
    let inner = REPORT_WIDTH - 6;
    let name = "REDRUN";
    let left = (inner - name.len()) / 2;
    let right = inner - name.len() - left;

    writeln!(out)?;
    heavy_rule(out)?;
    writeln!(out)?;
    writeln!(out, "  {}", "█".repeat(inner + 2))?;
    writeln!(out, "  █{}█", " ".repeat(inner))?;
    writeln!(out, "  █{}{name}{}█", " ".repeat(left), " ".repeat(right))?;
    writeln!(out, "  █{}█", " ".repeat(inner))?;
    writeln!(out, "  {}", "█".repeat(inner + 2))?;
    writeln!(out)?;
    heavy_rule(out)
}

/// One line naming the input, with size and modification time for files.
pub fn render_source<W: Write>(
    out: &mut W,
    name: &str,
    file: Option<&InputFile>,
) -> io::Result<()> {
    match file {
        Some(f) => {
            let modified = f
                .modified
                .map(|m| m.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            writeln!(
                out,
                "Source: {name} ({}, modified {modified})",
                format_size(f.size)
            )
        }
        None => writeln!(out, "Source: {name}"),
    }
}

/// Full report for one input. The banner is written separately so batch
/// output carries it once.
pub fn render_result<W: Write>(
    out: &mut W,
    result: &AnalysisResult,
    summary_only: bool,
) -> io::Result<()> {
    if result.is_clean() {
        writeln!(out, "{NO_ERRORS}")?;
        return Ok(());
    }

    render_summary(out, result)?;
    if !summary_only {
        render_details(out, &result.records)?;
    }
    Ok(())
}

fn render_summary<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    writeln!(out)?;
    heavy_rule(out)?;
    writeln!(out, "FAILURE SUMMARY")?;
    heavy_rule(out)?;
    writeln!(out, "Total log lines: {}", result.total_lines)?;
    writeln!(out, "Errors extracted: {}", result.errors_extracted)?;
    writeln!(out, "Noise filtered: {}", result.noise_filtered)?;
    writeln!(out)?;

    writeln!(out, "Category Breakdown:")?;
    light_rule(out)?;
    for (category, count) in result.breakdown_by_count() {
        writeln!(out, "  {:30} : {count}", category.label())?;
    }
    writeln!(out)
}

fn render_details<W: Write>(out: &mut W, records: &[ErrorRecord]) -> io::Result<()> {
    heavy_rule(out)?;
    writeln!(out, "DETAILED ERRORS")?;
    heavy_rule(out)?;

    for (i, record) in records.iter().enumerate() {
        let confidence = format!("{}%", record.classification.confidence);
        writeln!(out)?;
        writeln!(
            out,
            "{}. Line {:4} | [{:8}] | {:25} | Confidence: {confidence:>4}",
            i + 1,
            record.signal.start_line,
            record.signal.severity.label(),
            record.classification.category.label(),
        )?;

        if record.occurrence_count > 1 {
            let lines = record
                .occurrence_lines
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                out,
                "   Occurrences: {} (lines {lines})",
                record.occurrence_count
            )?;
        }
        if let Some(rule_id) = &record.classification.matched_rule_id {
            writeln!(out, "   Rule: {rule_id}")?;
        }
        for line in record.classification.message_preview.lines() {
            writeln!(out, "   {line}")?;
        }
    }
    writeln!(out)
}

/// The effective catalog in evaluation order.
pub fn render_rules<W: Write>(out: &mut W, catalog: &RuleCatalog) -> io::Result<()> {
    writeln!(
        out,
        "{} {} - {} rules (evaluation order)",
        constants::APP_NAME,
        constants::APP_VERSION,
        catalog.len()
    )?;
    light_rule(out)?;
    writeln!(
        out,
        "{:>5}  {:<32} {:<24} {:>4}  {}",
        "PRIO", "ID", "CATEGORY", "CONF", "SOURCE"
    )?;
    for rule in catalog.in_evaluation_order() {
        let source = if rule.is_builtin {
            "builtin".to_string()
        } else {
            rule.source.display().to_string()
        };
        writeln!(
            out,
            "{:>5}  {:<32} {:<24} {:>4}  {source}",
            rule.priority,
            rule.id,
            rule.category.label(),
            rule.base_confidence,
        )?;
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyzer::analyze;
    use crate::core::model::AnalyzeOptions;
    use crate::core::rules::load_builtin_rules;
    use chrono::TimeZone;

    fn catalog() -> RuleCatalog {
        RuleCatalog::new(load_builtin_rules().unwrap()).unwrap()
    }

    fn render(raw: &str, summary_only: bool) -> String {
        let result = analyze(raw, &catalog(), &AnalyzeOptions::default());
        let mut buf = Vec::new();
        render_result(&mut buf, &result, summary_only).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_clean_log_message() {
        let text = render("step 1 ok\nstep 2 ok\n", false);
        assert_eq!(text.trim(), NO_ERRORS);
    }

    #[test]
    fn test_summary_and_details() {
        let text = render(
            "ERROR: Connection refused to db-host:5432\nok\nERROR: Connection refused to db-host:5432\n",
            false,
        );
        assert!(text.contains("FAILURE SUMMARY"));
        assert!(text.contains("Total log lines: 3"));
        assert!(text.contains("Errors extracted: 2"));
        assert!(text.contains("Noise filtered: 0"));
        assert!(text.contains(&format!("  {:30} : 1", "Database Error")));
        assert!(text.contains("DETAILED ERRORS"));
        assert!(text.contains(&format!(
            "1. Line    1 | [ERROR   ] | {:25} | Confidence:  90%",
            "Database Error"
        )));
        assert!(text.contains("   Occurrences: 2 (lines 1, 3)"));
        assert!(text.contains("   Rule: db-connection-refused"));
        assert!(text.contains("   ERROR: Connection refused to db-host:5432"));
    }

    #[test]
    fn test_summary_only_omits_details() {
        let text = render("ERROR: Connection refused to db-host:5432\n", true);
        assert!(text.contains("FAILURE SUMMARY"));
        assert!(!text.contains("DETAILED ERRORS"));
    }

    #[test]
    fn test_banner_width() {
        let mut buf = Vec::new();
        render_banner(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("REDRUN"));
        for line in text.lines().filter(|l| !l.is_empty()) {
            let expected = if line.starts_with("  ") {
                REPORT_WIDTH - 2
            } else {
                REPORT_WIDTH
            };
            assert_eq!(line.chars().count(), expected, "{line:?}");
        }
    }

    #[test]
    fn test_source_line_with_metadata() {
        let file = InputFile {
            path: "build.log".into(),
            size: 2048,
            modified: Some(chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()),
            is_large: false,
        };
        let mut buf = Vec::new();
        render_source(&mut buf, "build.log", Some(&file)).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Source: build.log (2.0 KB, modified 2024-03-01 12:30:00 UTC)\n"
        );
    }

    #[test]
    fn test_rules_listing_in_evaluation_order() {
        let catalog = catalog();
        let mut buf = Vec::new();
        render_rules(&mut buf, &catalog).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let db = text.find("db-connection-refused").unwrap();
        let other = text.find("other-exit-code").unwrap();
        assert!(db < other);
        assert!(text.contains("builtin"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
