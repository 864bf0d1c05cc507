// RedRun - core/export.rs
//
// CSV and JSON export of analysis results.
// Core layer: writes to any Write trait object.

use crate::core::model::AnalysisResult;
use crate::util::error::ExportError;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// One analyzed input paired with its result, as written by the exporters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SourceReport<'a> {
    pub source: &'a str,
    #[serde(flatten)]
    pub result: &'a AnalysisResult,
}

/// Export one CSV row per error record across all reports.
///
/// Columns: source, index, start_line, end_line, severity, category,
/// confidence, occurrences, occurrence_lines, rule_id, preview.
/// `export_path` is used in error messages only.
pub fn export_csv<W: Write>(
    reports: &[SourceReport<'_>],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record([
            "source",
            "index",
            "start_line",
            "end_line",
            "severity",
            "category",
            "confidence",
            "occurrences",
            "occurrence_lines",
            "rule_id",
            "preview",
        ])
        .map_err(csv_err)?;

    let mut count = 0;
    for report in reports {
        for (idx, record) in report.result.records.iter().enumerate() {
            let occurrence_lines = record
                .occurrence_lines
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(";");

            csv_writer
                .write_record([
                    report.source,
                    &(idx + 1).to_string(),
                    &record.signal.start_line.to_string(),
                    &record.signal.end_line.to_string(),
                    record.signal.severity.label(),
                    record.classification.category.label(),
                    &record.classification.confidence.to_string(),
                    &record.occurrence_count.to_string(),
                    &occurrence_lines,
                    record.classification.matched_rule_id.as_deref().unwrap_or(""),
                    &record.classification.message_preview,
                ])
                .map_err(csv_err)?;
            count += 1;
        }
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    tracing::debug!(rows = count, path = %export_path.display(), "CSV export complete");
    Ok(count)
}

/// Export all reports as a pretty-printed JSON array.
pub fn export_json<W: Write>(
    reports: &[SourceReport<'_>],
    mut writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(&mut writer, reports).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    writeln!(writer).map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    tracing::debug!(reports = reports.len(), path = %export_path.display(), "JSON export complete");
    Ok(reports.len())
}
