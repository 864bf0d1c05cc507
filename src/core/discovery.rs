// RedRun - core/discovery.rs
//
// Expansion of command-line input arguments into an ordered list of input
// sources: explicit files, directories (walked recursively), glob patterns,
// and `-` for standard input.
//
// Reads only file *metadata*; content is read by platform::fs.
// Per-entry traversal errors are non-fatal and collected as warnings.
// Exclude patterns short-circuit directory descent via filter_entry so
// excluded subtrees (e.g. node_modules/) are never traversed at all.

use crate::util::constants;
use crate::util::error::InputError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Argument that selects standard input.
pub const STDIN_ARG: &str = "-";

// =============================================================================
// Input sources
// =============================================================================

/// A log file selected for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// True when the file is at or above the memory-map threshold.
    pub is_large: bool,
}

/// One input to analyze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(InputFile),
}

impl InputSource {
    /// Name shown in reports and error messages.
    pub fn display_name(&self) -> String {
        match self {
            InputSource::Stdin => "<stdin>".to_string(),
            InputSource::File(f) => f.path.display().to_string(),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for input expansion.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum directory recursion depth.
    pub max_depth: usize,

    /// Maximum number of files gathered across all arguments.
    pub max_files: usize,

    /// Glob patterns (filename-only) a file found in a directory must match.
    /// An empty list means "include everything that is not excluded".
    /// Explicit file arguments bypass this filter.
    pub include_patterns: Vec<String>,

    /// Glob patterns matched against filenames and directory names.
    /// Matching files are skipped; matching directories are not descended into.
    pub exclude_patterns: Vec<String>,

    /// File size (bytes) at or above which `is_large` is set.
    pub large_file_threshold: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            exclude_patterns: constants::DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            large_file_threshold: constants::DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }
}

/// Result of expanding all arguments.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    pub sources: Vec<InputSource>,
    /// Non-fatal problems (unreadable directory entries, unreadable glob
    /// matches). Reported to the user but do not stop the run.
    pub warnings: Vec<String>,
}

// =============================================================================
// Expansion
// =============================================================================

/// Expand CLI arguments into input sources, in argument order.
///
/// No arguments means standard input. Files found under a directory are
/// sorted by path; glob matches are sorted by path. A path reached twice is
/// analyzed once.
///
/// # Fatal errors
/// A path that does not exist (and is not a glob), an invalid glob, a
/// directory or glob that yields no files, or more than `max_files` files.
pub fn expand_inputs(args: &[String], config: &DiscoveryConfig) -> Result<Expansion, InputError> {
    let max_files = config.max_files.min(constants::ABSOLUTE_MAX_FILES);
    let max_depth = config.max_depth.min(constants::ABSOLUTE_MAX_DEPTH);

    let include_pats = compile_patterns(&config.include_patterns, "include");
    let exclude_pats = compile_patterns(&config.exclude_patterns, "exclude");

    if args.is_empty() {
        return Ok(Expansion {
            sources: vec![InputSource::Stdin],
            warnings: Vec::new(),
        });
    }

    let mut out = Expansion::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut stdin_added = false;

    for arg in args {
        if arg == STDIN_ARG {
            if !stdin_added {
                out.sources.push(InputSource::Stdin);
                stdin_added = true;
            }
            continue;
        }

        let path = Path::new(arg);
        let paths = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => vec![path.to_path_buf()],
            Ok(meta) if meta.is_dir() => {
                walk_directory(path, max_depth, &include_pats, &exclude_pats, &mut out.warnings)
            }
            Ok(_) => {
                return Err(InputError::NotAFile {
                    path: path.to_path_buf(),
                })
            }
            Err(_) if is_glob(arg) => expand_glob(arg, &exclude_pats, &mut out.warnings)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InputError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(InputError::Io {
                    source_name: arg.clone(),
                    source: e,
                })
            }
        };

        if paths.is_empty() {
            return Err(InputError::NoInputsMatched {
                argument: arg.clone(),
            });
        }

        for p in paths {
            if !seen.insert(p.clone()) {
                tracing::trace!(file = %p.display(), "Duplicate input skipped");
                continue;
            }
            if seen.len() > max_files {
                return Err(InputError::MaxFilesExceeded { max: max_files });
            }
            out.sources
                .push(InputSource::File(describe_file(p, config.large_file_threshold)));
        }
    }

    tracing::debug!(
        arguments = args.len(),
        sources = out.sources.len(),
        warnings = out.warnings.len(),
        "Input expansion complete"
    );

    Ok(out)
}

/// Collect metadata for one file. Metadata failures leave size 0 and no
/// mtime; the read itself will report the real error.
fn describe_file(path: PathBuf, large_file_threshold: u64) -> InputFile {
    let (size, modified) = match std::fs::metadata(&path) {
        Ok(m) => (m.len(), m.modified().ok().map(DateTime::<Utc>::from)),
        Err(_) => (0, None),
    };
    let is_large = size >= large_file_threshold;
    if is_large {
        tracing::debug!(
            file = %path.display(),
            size_mb = size / (1024 * 1024),
            "Large file flagged"
        );
    }
    InputFile {
        path,
        size,
        modified,
        is_large,
    }
}

/// Walk `root` and return matching files sorted by path.
fn walk_directory(
    root: &Path,
    max_depth: usize,
    include_pats: &[glob::Pattern],
    exclude_pats: &[glob::Pattern],
    warnings: &mut Vec<String>,
) -> Vec<PathBuf> {
    tracing::debug!(root = %root.display(), max_depth, "Walking directory");

    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // Always allow the root itself.
            if e.file_type().is_dir() && e.depth() > 0 {
                let name = e.file_name().to_str().unwrap_or("");
                return !is_excluded_component(name, exclude_pats);
            }
            true
        });

    let mut files = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let err = InputError::Traversal {
                    path: e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf()),
                    source: e,
                };
                tracing::debug!(warning = %err, "Discovery warning");
                warnings.push(err.to_string());
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            warnings.push(format!("Skipping '{}': non-UTF-8 filename", path.display()));
            continue;
        };

        if is_excluded_filename(file_name, exclude_pats) {
            tracing::trace!(file = file_name, "Excluded by pattern");
            continue;
        }
        if !is_included(file_name, include_pats) {
            tracing::trace!(file = file_name, "Not matched by include patterns");
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    files
}

/// Expand a glob argument into regular files, sorted by path.
fn expand_glob(
    pattern: &str,
    exclude_pats: &[glob::Pattern],
    warnings: &mut Vec<String>,
) -> Result<Vec<PathBuf>, InputError> {
    let paths = glob::glob(pattern).map_err(|e| InputError::InvalidGlob {
        pattern: pattern.to_string(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => {
                let excluded = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| is_excluded_filename(n, exclude_pats));
                if !excluded {
                    files.push(path);
                }
            }
            Ok(_) => {}
            Err(e) => warnings.push(format!("Cannot access glob match: {e}")),
        }
    }

    files.sort();
    tracing::debug!(pattern, matches = files.len(), "Glob expanded");
    Ok(files)
}

// =============================================================================
// Glob helpers
// =============================================================================

fn is_glob(arg: &str) -> bool {
    arg.contains(|c| matches!(c, '*' | '?' | '['))
}

/// Compile a list of glob pattern strings into `glob::Pattern` objects.
/// Patterns that fail to compile are logged as warnings and skipped.
fn compile_patterns(patterns: &[String], kind: &str) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, kind, error = %e, "Invalid glob pattern, skipping");
                None
            }
        })
        .collect()
}

/// Returns true if `dir_name` matches any exclude pattern that contains no
/// wildcard characters. These are treated as directory component exclusions
/// (e.g. "node_modules", ".git") rather than filename glob patterns.
fn is_excluded_component(dir_name: &str, exclude_pats: &[glob::Pattern]) -> bool {
    exclude_pats
        .iter()
        .any(|p| !is_glob(p.as_str()) && p.matches(dir_name))
}

fn is_excluded_filename(file_name: &str, exclude_pats: &[glob::Pattern]) -> bool {
    exclude_pats.iter().any(|p| p.matches(file_name))
}

/// An empty include list means "include all".
fn is_included(file_name: &str, include_pats: &[glob::Pattern]) -> bool {
    include_pats.is_empty() || include_pats.iter().any(|p| p.matches(file_name))
}

// =============================================================================
// Tests
// =============================================================================
