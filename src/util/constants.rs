// RedRun - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "RedRun";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "redrun";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Normalisation and signal detection
// =============================================================================

/// Maximum number of physical lines folded into a single error signal.
/// Continuation lines past this cap end the signal; the scan resumes after it.
pub const DEFAULT_MAX_SIGNAL_LINES: usize = 200;

/// Hard upper bound on the configurable signal length.
pub const ABSOLUTE_MAX_SIGNAL_LINES: usize = 10_000;

// =============================================================================
// Classification
// =============================================================================

/// Confidence assigned when no rule matches a signal.
pub const UNMATCHED_CONFIDENCE: u8 = 10;

/// Fixed confidence reduction applied when a signal's severity is weaker
/// than the winning rule's expected severity.
pub const SEVERITY_PENALTY: u8 = 15;

/// Number of preceding signals consulted for the context boost.
pub const CONTEXT_WINDOW: usize = 3;

/// Confidence added per preceding signal a rule placed in the same category.
pub const CONTEXT_BOOST_PER_NEIGHBOUR: u8 = 5;

/// Upper bound on the total context boost for one signal.
pub const MAX_CONTEXT_BOOST: u8 = 15;

/// Signals classified as Other with a confidence below this value are noise.
pub const DEFAULT_NOISE_THRESHOLD: u8 = 20;

/// Maximum characters kept in a classification's message preview.
pub const DEFAULT_PREVIEW_MAX_CHARS: usize = 400;

/// Minimum configurable preview length.
pub const MIN_PREVIEW_MAX_CHARS: usize = 40;

/// Maximum configurable preview length.
pub const ABSOLUTE_MAX_PREVIEW_CHARS: usize = 10_000;

/// Maximum source lines kept in a classification's message preview.
pub const DEFAULT_PREVIEW_MAX_LINES: usize = 3;

/// Maximum configurable number of preview lines.
pub const ABSOLUTE_MAX_PREVIEW_LINES: usize = 50;

// =============================================================================
// Rule catalog limits
// =============================================================================

/// Maximum number of rules in one catalog (built-in + user).
pub const MAX_RULES: usize = 500;

/// Maximum size of a rule TOML file in bytes.
pub const MAX_RULE_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// Maximum regex pattern length to prevent ReDoS.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

/// Lowest accepted rule priority.
pub const MIN_RULE_PRIORITY: i64 = 0;

/// Highest accepted rule priority.
pub const MAX_RULE_PRIORITY: i64 = 1_000;

/// Maximum rule base confidence.
pub const MAX_RULE_CONFIDENCE: i64 = 100;

// =============================================================================
// Input limits
// =============================================================================

/// File size threshold in bytes above which the file is memory-mapped
/// rather than read into a heap buffer.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 64 * 1024 * 1024; // 64 MB

/// Number of leading bytes inspected for NUL bytes when deciding whether
/// an input is text.
pub const BINARY_SNIFF_BYTES: usize = 8 * 1024;

/// Maximum directory recursion depth when an input argument is a directory.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Hard upper bound on max depth.
pub const ABSOLUTE_MAX_DEPTH: usize = 50;

/// Maximum number of files gathered from directory and glob arguments.
pub const DEFAULT_MAX_FILES: usize = 500;

/// Hard upper bound on max files.
pub const ABSOLUTE_MAX_FILES: usize = 10_000;

/// Default include glob patterns for log files found in directories.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*.log", "*.log.[0-9]*", "*.txt", "*.out"];

/// Default exclude glob patterns (matched against file and directory names).
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "*.gz",
    "*.zip",
    "*.bak",
    "*.tmp",
    "node_modules",
    ".git",
    "target",
];

/// Attempts for reading a file when the OS reports a transient error.
pub const READ_MAX_RETRIES: usize = 3;

/// Backoff between read attempts, in milliseconds.
pub const READ_RETRY_DELAYS_MS: [u64; READ_MAX_RETRIES] = [50, 100, 200];

// =============================================================================
// Logging
// =============================================================================

/// Default log level. Kept quiet so diagnostics never crowd the report.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Rendering
// =============================================================================

/// Width of the terminal report's rule lines.
pub const REPORT_WIDTH: usize = 80;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// User rules subdirectory name (loaded automatically when present).
pub const RULES_DIR_NAME: &str = "rules";
