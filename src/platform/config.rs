// RedRun - platform/config.rs
//
// Platform directory resolution and config.toml loading with validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for RedRun configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/redrun/ or %APPDATA%\redrun\config\)
    pub config_dir: PathBuf,

    /// Default config file inside `config_dir`.
    pub config_file: PathBuf,

    /// User rules directory, loaded automatically when it exists.
    pub user_rules_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        let config_dir = match ProjectDirs::from("", "", constants::APP_ID) {
            Some(dirs) => dirs.config_dir().to_path_buf(),
            None => {
                tracing::warn!("Could not determine platform directories, using current directory");
                PathBuf::from(".")
            }
        };
        let paths = Self::under(config_dir);
        tracing::debug!(
            config = %paths.config_dir.display(),
            rules = %paths.user_rules_dir.display(),
            "Platform paths resolved"
        );
        paths
    }

    /// Paths rooted at an explicit configuration directory.
    pub fn under(config_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join(constants::CONFIG_FILE_NAME),
            user_rules_dir: config_dir.join(constants::RULES_DIR_NAME),
            config_dir,
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file works with an
/// older binary. Numbers are read as i64 so negative values reach
/// validation instead of failing the whole parse.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub analysis: AnalysisSection,
    pub discovery: DiscoverySection,
    pub rules: RulesSection,
    pub logging: LoggingSection,
}

/// `[analysis]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub noise_threshold: Option<i64>,
    pub max_signal_lines: Option<i64>,
    pub preview_max_chars: Option<i64>,
    pub preview_max_lines: Option<i64>,
}

/// `[discovery]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub max_depth: Option<i64>,
    pub max_files: Option<i64>,
    pub include_patterns: Option<Vec<String>>,
    pub exclude_patterns: Option<Vec<String>>,
}

/// `[rules]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RulesSection {
    /// Rule file or directory of rule files.
    pub path: Option<String>,
    /// Whether the built-in catalog is loaded.
    pub builtin: Option<bool>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    // -- Analysis --
    pub noise_threshold: u8,
    pub max_signal_lines: usize,
    pub preview_max_chars: usize,
    pub preview_max_lines: usize,

    // -- Discovery --
    pub max_depth: usize,
    pub max_files: usize,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,

    // -- Rules --
    pub rules_path: Option<PathBuf>,
    pub builtin_rules: bool,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect();
        Self {
            noise_threshold: constants::DEFAULT_NOISE_THRESHOLD,
            max_signal_lines: constants::DEFAULT_MAX_SIGNAL_LINES,
            preview_max_chars: constants::DEFAULT_PREVIEW_MAX_CHARS,
            preview_max_lines: constants::DEFAULT_PREVIEW_MAX_LINES,
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            include_patterns: owned(constants::DEFAULT_INCLUDE_PATTERNS),
            exclude_patterns: owned(constants::DEFAULT_EXCLUDE_PATTERNS),
            rules_path: None,
            builtin_rules: true,
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate a config file.
///
/// Returns the validated config plus non-fatal warnings. A missing or
/// unreadable file yields defaults, unless `explicit` (the user passed
/// `--config`), in which case it is an error. An unparseable file always
/// yields defaults with a warning.
pub fn load_config(
    config_path: &Path,
    explicit: bool,
) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let mut warnings: Vec<String> = Vec::new();

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
            tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
            return Ok((AppConfig::default(), warnings));
        }
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source: e,
            };
            if explicit {
                return Err(err);
            }
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return Ok((AppConfig::default(), warnings));
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let err = ConfigError::TomlParse {
                path: config_path.to_path_buf(),
                source: e,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return Ok((AppConfig::default(), warnings));
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let config = validate(raw, config_path, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    Ok((config, warnings))
}

/// Validate each field against named constants, accumulating warnings.
fn validate(raw: RawConfig, config_path: &Path, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();

    let mut check = |field: &str, value: Option<i64>, min: i64, max: i64, default: usize| {
        let value = value?;
        if (min..=max).contains(&value) {
            // In range, and every range here is non-negative.
            Some(value as usize)
        } else {
            let err = ConfigError::ValueOutOfRange {
                field: field.to_string(),
                value: value.to_string(),
                expected: format!("{min}-{max}"),
            };
            warnings.push(format!("{err}. Using default ({default})."));
            None
        }
    };

    if let Some(v) = check(
        "analysis.noise_threshold",
        raw.analysis.noise_threshold,
        0,
        100,
        constants::DEFAULT_NOISE_THRESHOLD as usize,
    ) {
        config.noise_threshold = v as u8;
    }
    if let Some(v) = check(
        "analysis.max_signal_lines",
        raw.analysis.max_signal_lines,
        1,
        constants::ABSOLUTE_MAX_SIGNAL_LINES as i64,
        constants::DEFAULT_MAX_SIGNAL_LINES,
    ) {
        config.max_signal_lines = v;
    }
    if let Some(v) = check(
        "analysis.preview_max_chars",
        raw.analysis.preview_max_chars,
        constants::MIN_PREVIEW_MAX_CHARS as i64,
        constants::ABSOLUTE_MAX_PREVIEW_CHARS as i64,
        constants::DEFAULT_PREVIEW_MAX_CHARS,
    ) {
        config.preview_max_chars = v;
    }
    if let Some(v) = check(
        "analysis.preview_max_lines",
        raw.analysis.preview_max_lines,
        1,
        constants::ABSOLUTE_MAX_PREVIEW_LINES as i64,
        constants::DEFAULT_PREVIEW_MAX_LINES,
    ) {
        config.preview_max_lines = v;
    }
    if let Some(v) = check(
        "discovery.max_depth",
        raw.discovery.max_depth,
        1,
        constants::ABSOLUTE_MAX_DEPTH as i64,
        constants::DEFAULT_MAX_DEPTH,
    ) {
        config.max_depth = v;
    }
    if let Some(v) = check(
        "discovery.max_files",
        raw.discovery.max_files,
        1,
        constants::ABSOLUTE_MAX_FILES as i64,
        constants::DEFAULT_MAX_FILES,
    ) {
        config.max_files = v;
    }

    if let Some(patterns) = raw.discovery.include_patterns {
        config.include_patterns = patterns;
    }
    if let Some(patterns) = raw.discovery.exclude_patterns {
        config.exclude_patterns = patterns;
    }

    // -- Rules --
    if let Some(path) = raw.rules.path.filter(|p| !p.trim().is_empty()) {
        let path = PathBuf::from(path);
        // Relative rule paths are relative to the config file.
        config.rules_path = Some(if path.is_relative() {
            config_path.parent().unwrap_or(Path::new(".")).join(path)
        } else {
            path
        });
    }
    if let Some(builtin) = raw.rules.builtin {
        config.builtin_rules = builtin;
    }

    // -- Logging --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default ({}).",
                constants::DEFAULT_LOG_LEVEL,
            ));
        }
    }
    if let Some(file) = raw.logging.file.filter(|f| !f.is_empty()) {
        config.log_file = Some(file);
    }

    config
}
