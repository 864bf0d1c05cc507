// RedRun - core/grouper.rs
//
// Noise filtering and deduplication of classified signals into
// ErrorRecords keyed by (category, normalised message).

use crate::core::model::{Category, Classification, ErrorRecord, ErrorSignal};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Output of grouping: records in first-seen order plus the noise count.
#[derive(Debug, Clone, Default)]
pub struct Grouped {
    pub records: Vec<ErrorRecord>,
    pub noise_filtered: usize,
}

struct Normalizers {
    timestamp: Regex,
    uuid: Regex,
    hex: Regex,
    path: Regex,
    digits: Regex,
    whitespace: Regex,
}

fn normalizers() -> &'static Normalizers {
    static NORMALIZERS: OnceLock<Normalizers> = OnceLock::new();
    NORMALIZERS.get_or_init(|| {
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("grouper: invalid built-in regex")
        }
        Normalizers {
            timestamp: re(
                r"\d{4}[-/]\d{2}[-/]\d{2}(?:[t ]\d{2}:\d{2}(?::\d{2})?(?:[.,]\d+)?(?:z|[+-]\d{2}:?\d{2})?)?|\b\d{2}:\d{2}:\d{2}(?:[.,]\d+)?\b",
            ),
            uuid: re(r"\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b"),
            hex: re(r"\b0x[0-9a-f]+\b|\b[0-9a-f]{12,}\b"),
            path: re(r#"(?:[a-z]:\\|\.{0,2}/)[^\s:'"()\[\]]+"#),
            digits: re(r"\d+"),
            whitespace: re(r"\s+"),
        }
    })
}

/// Normalise a message for grouping: lowercase, replace timestamps, UUIDs,
/// hex values, file paths and digit runs with placeholders, collapse
/// whitespace.
pub fn normalize_message(text: &str) -> String {
    let n = normalizers();
    let lower = text.to_lowercase();
    let s = n.timestamp.replace_all(&lower, "<ts>");
    let s = n.uuid.replace_all(&s, "<uuid>");
    let s = n.hex.replace_all(&s, "<hex>");
    let s = n.path.replace_all(&s, "<path>");
    let s = n.digits.replace_all(&s, "<n>");
    let s = n.whitespace.replace_all(&s, " ");
    s.trim().to_string()
}

/// True when a classification is below the reporting threshold.
pub fn is_noise(classification: &Classification, noise_threshold: u8) -> bool {
    classification.category == Category::Other && classification.confidence < noise_threshold
}

/// Drop noise and fold the remaining signals into records.
///
/// `signals` and `classifications` are parallel slices. The first signal of
/// each group (and its classification) represents the record; later
/// duplicates only increment `occurrence_count` and extend
/// `occurrence_lines`.
pub fn group(
    signals: &[ErrorSignal],
    classifications: &[Classification],
    noise_threshold: u8,
) -> Grouped {
    debug_assert_eq!(signals.len(), classifications.len());

    let mut records: Vec<ErrorRecord> = Vec::new();
    let mut index: HashMap<(Category, String), usize> = HashMap::new();
    let mut noise_filtered = 0;

    for (signal, classification) in signals.iter().zip(classifications) {
        if is_noise(classification, noise_threshold) {
            noise_filtered += 1;
            continue;
        }

        let key = (classification.category, normalize_message(&signal.raw_text));
        match index.get(&key) {
            Some(&pos) => {
                let record = &mut records[pos];
                record.occurrence_count += 1;
                record.occurrence_lines.push(signal.start_line);
            }
            None => {
                index.insert(key, records.len());
                records.push(ErrorRecord {
                    signal: signal.clone(),
                    classification: classification.clone(),
                    occurrence_count: 1,
                    occurrence_lines: vec![signal.start_line],
                });
            }
        }
    }

    tracing::debug!(
        records = records.len(),
        noise = noise_filtered,
        "Grouping complete"
    );

    Grouped {
        records,
        noise_filtered,
    }
}
