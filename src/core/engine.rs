// RedRun - core/engine.rs
//
// Rule engine: assigns exactly one Classification to every signal.
// First matching rule in evaluation order (priority desc, declaration
// order) wins. Batch classification then applies the context boost.
// Total and pure: never fails, never mutates the catalog.

use crate::core::model::{Category, Classification, ErrorSignal};
use crate::core::rules::{Rule, RuleCatalog};
use crate::util::constants;
use std::collections::BTreeMap;

/// Preview limits applied to `message_preview`.
#[derive(Debug, Clone, Copy)]
pub struct PreviewLimits {
    pub max_chars: usize,
    pub max_lines: usize,
}

impl Default for PreviewLimits {
    fn default() -> Self {
        Self {
            max_chars: constants::DEFAULT_PREVIEW_MAX_CHARS,
            max_lines: constants::DEFAULT_PREVIEW_MAX_LINES,
        }
    }
}

/// Classifies signals against a borrowed, immutable catalog.
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'a> {
    catalog: &'a RuleCatalog,
    preview: PreviewLimits,
}

impl<'a> RuleEngine<'a> {
    pub fn new(catalog: &'a RuleCatalog, preview: PreviewLimits) -> Self {
        Self { catalog, preview }
    }

    /// The winning rule for `signal`, if any.
    pub fn winning_rule(&self, signal: &ErrorSignal) -> Option<&'a Rule> {
        self.catalog
            .in_evaluation_order()
            .find(|rule| rule.matches(signal))
    }

    /// Classify one signal.
    pub fn classify(&self, signal: &ErrorSignal) -> Classification {
        let message_preview = preview(&signal.raw_text, self.preview);

        match self.winning_rule(signal) {
            Some(rule) => {
                let confidence = rule_confidence(rule, signal);
                tracing::trace!(
                    line = signal.start_line,
                    rule_id = %rule.id,
                    category = %rule.category,
                    confidence,
                    text = crate::util::logging::preview(signal.first_line()),
                    "Signal classified"
                );
                Classification {
                    category: rule.category,
                    confidence,
                    matched_rule_id: Some(rule.id.clone()),
                    message_preview,
                }
            }
            None => {
                tracing::trace!(
                    line = signal.start_line,
                    text = crate::util::logging::preview(signal.first_line()),
                    "Signal matched no rule"
                );
                Classification {
                    category: Category::Other,
                    confidence: constants::UNMATCHED_CONFIDENCE,
                    matched_rule_id: None,
                    message_preview,
                }
            }
        }
    }

    /// Classify every signal, preserving order.
    ///
    /// A rule-matched signal gains `CONTEXT_BOOST_PER_NEIGHBOUR` confidence
    /// for each of the preceding `CONTEXT_WINDOW` signals that a rule placed
    /// in the same category, up to `MAX_CONTEXT_BOOST` and clamped to 100.
    /// The boost never changes a category, and unmatched signals are
    /// neither boosted nor counted as neighbours.
    pub fn classify_all(&self, signals: &[ErrorSignal]) -> Vec<Classification> {
        let mut classifications: Vec<Classification> =
            signals.iter().map(|s| self.classify(s)).collect();

        let boosts: Vec<u8> = (0..classifications.len())
            .map(|i| context_boost(&classifications, i))
            .collect();
        for (classification, boost) in classifications.iter_mut().zip(boosts) {
            classification.confidence = classification.confidence.saturating_add(boost).min(100);
        }

        let hits = rule_hits(&classifications);
        tracing::debug!(
            signals = classifications.len(),
            matched = hits.values().sum::<usize>(),
            hits = ?hits,
            "Classification complete"
        );

        classifications
    }
}

/// Confidence added to `classifications[index]` for same-category
/// neighbours among the preceding `CONTEXT_WINDOW` signals.
fn context_boost(classifications: &[Classification], index: usize) -> u8 {
    let current = &classifications[index];
    if current.matched_rule_id.is_none() {
        return 0;
    }
    let window = &classifications[index.saturating_sub(constants::CONTEXT_WINDOW)..index];
    let neighbours = window
        .iter()
        .filter(|c| c.matched_rule_id.is_some() && c.category == current.category)
        .count();
    let boost = neighbours.saturating_mul(constants::CONTEXT_BOOST_PER_NEIGHBOUR as usize);
    boost.min(constants::MAX_CONTEXT_BOOST as usize) as u8
}

/// Number of signals each rule won, keyed by rule id. Unmatched signals
/// are not counted.
pub fn rule_hits(classifications: &[Classification]) -> BTreeMap<String, usize> {
    let mut hits = BTreeMap::new();
    for rule_id in classifications.iter().filter_map(|c| c.matched_rule_id.as_ref()) {
        *hits.entry(rule_id.clone()).or_insert(0) += 1;
    }
    hits
}

/// Base confidence, reduced by `SEVERITY_PENALTY` when the signal is less
/// severe than the rule expects. Clamped to 0-100.
fn rule_confidence(rule: &Rule, signal: &ErrorSignal) -> u8 {
    let mut confidence = rule.base_confidence.min(100);
    if signal.severity.is_weaker_than(rule.expected_severity) {
        confidence = confidence.saturating_sub(constants::SEVERITY_PENALTY);
    }
    confidence
}

/// First `max_lines` lines of `text`, at most `max_chars` characters, with
/// "..." appended when anything was cut.
pub fn preview(text: &str, limits: PreviewLimits) -> String {
    let max_lines = limits.max_lines.max(1);
    let mut lines = text.lines();
    let head: Vec<&str> = lines.by_ref().take(max_lines).collect();
    let mut truncated = lines.next().is_some();

    let mut out = head.join("\n");
    if let Some((idx, _)) = out.char_indices().nth(limits.max_chars) {
        out.truncate(idx);
        truncated = true;
    }

    if truncated {
        out.push_str("...");
    }
    out
}
