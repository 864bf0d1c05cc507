// RedRun - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers: the pipeline
// stages produce them, the renderer and exporters consume them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Log line (output of normalisation)
// =============================================================================

/// One physical line of input after normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// 1-based line number, addressable in the original file.
    pub line_number: u64,

    /// Line text with control characters and ANSI sequences removed.
    pub text: String,
}

// =============================================================================
// Severity
// =============================================================================

/// Normalised severity of an error signal, most severe first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Fatal,
    Critical,
    Error,
    Warn,
    #[default]
    Unknown,
}

impl Severity {
    /// Numeric strength used for severity comparisons (higher is more severe).
    pub fn strength(&self) -> u8 {
        match self {
            Severity::Fatal => 4,
            Severity::Critical => 3,
            Severity::Error => 2,
            Severity::Warn => 1,
            Severity::Unknown => 0,
        }
    }

    /// True when `self` is strictly weaker than `other`.
    pub fn is_weaker_than(&self, other: Severity) -> bool {
        self.strength() < other.strength()
    }

    /// Upper-case label as shown in the detailed report.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Fatal => "FATAL",
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = String;

    /// Accepts the labels plus common aliases (`warning`, `crit`, `err`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(Severity::Fatal),
            "critical" | "crit" => Ok(Severity::Critical),
            "error" | "err" => Ok(Severity::Error),
            "warn" | "warning" => Ok(Severity::Warn),
            "unknown" => Ok(Severity::Unknown),
            other => Err(other.to_string()),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// The fixed, closed set of failure categories.
///
/// Declaration order is the canonical display order and the key order of
/// `AnalysisResult::category_breakdown`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    TestFailure,
    DependencyError,
    InfrastructureTimeout,
    BuildError,
    LintError,
    AuthenticationError,
    NetworkError,
    ConfigurationError,
    DatabaseError,
    PermissionError,
    ResourceError,
    Other,
}

impl Category {
    /// Returns all twelve categories in canonical order.
    pub fn all() -> &'static [Category] {
        &[
            Category::TestFailure,
            Category::DependencyError,
            Category::InfrastructureTimeout,
            Category::BuildError,
            Category::LintError,
            Category::AuthenticationError,
            Category::NetworkError,
            Category::ConfigurationError,
            Category::DatabaseError,
            Category::PermissionError,
            Category::ResourceError,
            Category::Other,
        ]
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Category::TestFailure => "Test Failure",
            Category::DependencyError => "Dependency Error",
            Category::InfrastructureTimeout => "Infrastructure Timeout",
            Category::BuildError => "Build Error",
            Category::LintError => "Lint Error",
            Category::AuthenticationError => "Authentication Error",
            Category::NetworkError => "Network Error",
            Category::ConfigurationError => "Configuration Error",
            Category::DatabaseError => "Database Error",
            Category::PermissionError => "Permission Error",
            Category::ResourceError => "Resource Error",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Parses a label ("Test Failure"), snake_case ("test_failure") or
    /// kebab-case ("test-failure") name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        Category::all()
            .iter()
            .copied()
            .find(|cat| {
                let name: String = cat
                    .label()
                    .chars()
                    .filter(|c| *c != ' ')
                    .flat_map(char::to_lowercase)
                    .collect();
                name == wanted
            })
            .ok_or_else(|| s.to_string())
    }
}

// =============================================================================
// Error signal (output of detection)
// =============================================================================

/// A candidate error occurrence, possibly spanning several source lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSignal {
    /// Line number of the trigger line.
    pub start_line: u64,

    /// Line number of the last folded continuation line (>= start_line).
    pub end_line: u64,

    /// Severity derived from the trigger line.
    pub severity: Severity,

    /// All folded lines joined with '\n'. Never empty.
    pub raw_text: String,
}

impl ErrorSignal {
    /// Number of physical lines this signal spans.
    pub fn line_count(&self) -> u64 {
        self.end_line - self.start_line + 1
    }

    /// The trigger line's text.
    pub fn first_line(&self) -> &str {
        self.raw_text.lines().next().unwrap_or("")
    }
}

// =============================================================================
// Classification (output of the rule engine)
// =============================================================================

/// Outcome of applying the rule catalog to one signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,

    /// Rule-derived confidence, 0-100.
    pub confidence: u8,

    /// Id of the winning rule; `None` when no rule matched.
    pub matched_rule_id: Option<String>,

    /// Truncated signal text for display.
    pub message_preview: String,
}

// =============================================================================
// Error record (output of grouping)
// =============================================================================

/// A deduplicated, classified, user-facing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// First signal seen for this group.
    pub signal: ErrorSignal,

    /// Classification of the first signal.
    pub classification: Classification,

    /// Number of signals folded into this record (>= 1).
    pub occurrence_count: usize,

    /// Start line of every folded signal, in input order.
    pub occurrence_lines: Vec<u64>,
}

// =============================================================================
// Analysis result (output of aggregation)
// =============================================================================

/// Final immutable output of one `analyze` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    /// Count of all normalised lines seen.
    pub total_lines: usize,

    /// Count of all signals the detector produced.
    pub signals_detected: usize,

    /// Sum of `occurrence_count` over `records`.
    pub errors_extracted: usize,

    /// Signals dropped as noise.
    pub noise_filtered: usize,

    /// Records in first-seen order.
    pub records: Vec<ErrorRecord>,

    /// Number of records per category.
    pub category_breakdown: BTreeMap<Category, usize>,
}

impl AnalysisResult {
    /// Category breakdown sorted by record count (descending), ties in
    /// canonical category order.
    pub fn breakdown_by_count(&self) -> Vec<(Category, usize)> {
        let mut rows: Vec<(Category, usize)> = self
            .category_breakdown
            .iter()
            .map(|(cat, count)| (*cat, *count))
            .collect();
        // Stable sort keeps BTreeMap (canonical) order for equal counts.
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows
    }

    /// True when no error records were produced.
    pub fn is_clean(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Analysis options
// =============================================================================

/// Options for one `analyze` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Renderer hint only: print the summary without the detailed listing.
    pub summary_only: bool,

    /// Other-category signals below this confidence are noise.
    pub noise_threshold: u8,

    /// Maximum physical lines folded into one signal.
    pub max_signal_lines: usize,

    /// Maximum characters in a message preview.
    pub preview_max_chars: usize,

    /// Maximum source lines in a message preview.
    pub preview_max_lines: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        use crate::util::constants;
        Self {
            summary_only: false,
            noise_threshold: constants::DEFAULT_NOISE_THRESHOLD,
            max_signal_lines: constants::DEFAULT_MAX_SIGNAL_LINES,
            preview_max_chars: constants::DEFAULT_PREVIEW_MAX_CHARS,
            preview_max_lines: constants::DEFAULT_PREVIEW_MAX_LINES,
        }
    }
}
