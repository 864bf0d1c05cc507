// RedRun - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// The classification pipeline itself has no error paths; everything here
// belongs to configuration, input acquisition, or export.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all RedRun operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum RedRunError {
    /// Rule catalog loading or validation failed.
    Rules(RuleError),

    /// Input acquisition failed.
    Input(InputError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for RedRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rules(e) => write!(f, "Rule catalog error: {e}"),
            Self::Input(e) => write!(f, "Input error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for RedRunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rules(e) => Some(e),
            Self::Input(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

/// Errors related to rule catalog loading and validation.
///
/// `rule` is the offending rule's id, or `#N` (1-based position in its file)
/// when the id itself is missing.
#[derive(Debug)]
pub enum RuleError {
    /// TOML file could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Rule file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// A required field is missing or empty.
    MissingField {
        path: PathBuf,
        rule: String,
        field: &'static str,
    },

    /// The category is not one of the fixed closed set.
    UnknownCategory {
        path: PathBuf,
        rule: String,
        value: String,
    },

    /// A severity name is not recognised.
    UnknownSeverity {
        path: PathBuf,
        rule: String,
        value: String,
    },

    /// Priority is outside the accepted range.
    InvalidPriority {
        path: PathBuf,
        rule: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Base confidence is outside 0-100.
    InvalidConfidence {
        path: PathBuf,
        rule: String,
        value: i64,
    },

    /// A regex pattern is invalid.
    InvalidRegex {
        path: PathBuf,
        rule: String,
        pattern: String,
        source: regex::Error,
    },

    /// A regex pattern exceeds the maximum allowed length.
    RegexTooLong {
        path: PathBuf,
        rule: String,
        length: usize,
        max_length: usize,
    },

    /// Two rules in the same file, or in the files of one checked
    /// directory, share an id.
    DuplicateId { id: String, path: PathBuf },

    /// Maximum number of rules exceeded.
    TooManyRules { count: usize, max: usize },

    /// The effective catalog has no rules at all.
    EmptyCatalog,

    /// I/O error reading a rule file or directory.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse TOML '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Rule file '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::MissingField { path, rule, field } => write!(
                f,
                "'{}': rule '{rule}': missing required field '{field}'",
                path.display()
            ),
            Self::UnknownCategory { path, rule, value } => write!(
                f,
                "'{}': rule '{rule}': unknown category '{value}'",
                path.display()
            ),
            Self::UnknownSeverity { path, rule, value } => write!(
                f,
                "'{}': rule '{rule}': unknown severity '{value}' \
                 (expected fatal, critical, error, warn or unknown)",
                path.display()
            ),
            Self::InvalidPriority {
                path,
                rule,
                value,
                min,
                max,
            } => write!(
                f,
                "'{}': rule '{rule}': priority {value} is out of range ({min}-{max})",
                path.display()
            ),
            Self::InvalidConfidence { path, rule, value } => write!(
                f,
                "'{}': rule '{rule}': confidence {value} is out of range (0-100)",
                path.display()
            ),
            Self::InvalidRegex {
                path,
                rule,
                pattern,
                source,
            } => write!(
                f,
                "'{}': rule '{rule}': invalid pattern ('{pattern}'): {source}",
                path.display()
            ),
            Self::RegexTooLong {
                path,
                rule,
                length,
                max_length,
            } => write!(
                f,
                "'{}': rule '{rule}': pattern is {length} chars, \
                 exceeds maximum of {max_length}",
                path.display()
            ),
            Self::DuplicateId { id, path } => {
                write!(f, "Duplicate rule id '{id}' in '{}'", path.display())
            }
            Self::TooManyRules { count, max } => {
                write!(f, "Too many rules loaded ({count}), maximum is {max}")
            }
            Self::EmptyCatalog => write!(
                f,
                "Rule catalog is empty; provide a rule file or enable the built-in rules"
            ),
            Self::Io { path, source } => {
                write!(f, "I/O error reading rules '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for RuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RuleError> for RedRunError {
    fn from(e: RuleError) -> Self {
        Self::Rules(e)
    }
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

/// Errors related to acquiring raw log text.
#[derive(Debug)]
pub enum InputError {
    /// The path does not exist.
    NotFound { path: PathBuf },

    /// The path exists but is neither a regular file nor a directory.
    NotAFile { path: PathBuf },

    /// No input argument was given and stdin is an interactive terminal.
    StdinIsTerminal,

    /// The content looks binary (NUL bytes near the start).
    NonText { source_name: String },

    /// A glob pattern argument could not be compiled.
    InvalidGlob {
        pattern: String,
        source: glob::PatternError,
    },

    /// A directory or glob argument matched no log files.
    NoInputsMatched { argument: String },

    /// Too many files were gathered from directory/glob arguments.
    MaxFilesExceeded { max: usize },

    /// Walkdir traversal error.
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// I/O error while reading an input.
    Io { source_name: String, source: io::Error },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => write!(f, "File not found: {}", path.display()),
            Self::NotAFile { path } => write!(f, "Not a file: {}", path.display()),
            Self::StdinIsTerminal => write!(
                f,
                "No file provided and stdin is a terminal. Provide a file path or pipe input."
            ),
            Self::NonText { source_name } => {
                write!(f, "'{source_name}' does not look like text (binary content)")
            }
            Self::InvalidGlob { pattern, source } => {
                write!(f, "Invalid glob pattern '{pattern}': {source}")
            }
            Self::NoInputsMatched { argument } => {
                write!(f, "'{argument}' did not match any log files")
            }
            Self::MaxFilesExceeded { max } => write!(
                f,
                "Input expansion stopped: exceeded maximum of {max} files. \
                 Increase [discovery] max_files in config or narrow the arguments."
            ),
            Self::Traversal { path, source } => {
                write!(f, "Error traversing '{}': {source}", path.display())
            }
            Self::Io {
                source_name,
                source,
            } => write!(f, "'{source_name}': I/O error: {source}"),
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidGlob { source, .. } => Some(source),
            Self::Traversal { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<InputError> for RedRunError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for RedRunError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for RedRunError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for RedRun results.
pub type Result<T> = std::result::Result<T, RedRunError>;
