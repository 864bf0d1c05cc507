// RedRun - app/rule_mgr.rs
//
// Builds the effective rule catalog from the built-in rules (embedded in
// the binary) and user-defined TOML files on disk. A user rule with the
// same id as an existing rule replaces it in place; new ids are appended.
// Within one source (a file or a directory of files) ids must be unique.
//
// Any invalid rule file is a configuration error: nothing is skipped.

use crate::core::rules::{self, Rule, RuleCatalog};
use crate::util::constants;
use crate::util::error::RuleError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where rules come from, in merge order.
#[derive(Debug, Clone, Default)]
pub struct RuleSources {
    /// Load the embedded catalog first.
    pub builtin: bool,
    /// Directory loaded only when it exists (the platform rules dir).
    pub auto_dir: Option<PathBuf>,
    /// File or directory that must exist (`--rules` / `[rules] path`).
    pub explicit: Option<PathBuf>,
}

/// Load and merge all rule sources into one immutable catalog.
pub fn load_catalog(sources: &RuleSources) -> Result<RuleCatalog, RuleError> {
    let mut catalog = if sources.builtin {
        let builtin = rules::load_builtin_rules()?;
        tracing::info!(count = builtin.len(), "Loaded built-in rules");
        RuleCatalog::new(builtin)?
    } else {
        tracing::info!("Built-in rules disabled");
        RuleCatalog::empty()
    };

    if let Some(dir) = &sources.auto_dir {
        if dir.is_dir() {
            catalog = catalog.merge(load_rule_files(&rule_files_in(dir)?)?)?;
        } else {
            tracing::debug!(
                dir = %dir.display(),
                "User rules directory does not exist (skipping)"
            );
        }
    }

    if let Some(path) = &sources.explicit {
        catalog = catalog.merge(load_rule_files(&rule_files_at(path)?)?)?;
    }

    if catalog.is_empty() {
        return Err(RuleError::EmptyCatalog);
    }

    tracing::info!(total = catalog.len(), "Rule catalog ready");
    Ok(catalog)
}

/// Validate one rule file (or every file in a directory) without merging
/// it into anything. Returns the compiled rules in declaration order.
pub fn check_rules(path: &Path) -> Result<Vec<Rule>, RuleError> {
    let all = load_rule_files(&rule_files_at(path)?)?;
    if all.len() > constants::MAX_RULES {
        return Err(RuleError::TooManyRules {
            count: all.len(),
            max: constants::MAX_RULES,
        });
    }
    Ok(all)
}

/// Rule files at an explicit path: the file itself, or every `.toml` file
/// in the directory. The path must exist.
fn rule_files_at(path: &Path) -> Result<Vec<PathBuf>, RuleError> {
    let metadata = std::fs::metadata(path).map_err(|e| RuleError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.is_dir() {
        rule_files_in(path)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

/// `.toml` files directly inside `dir`, sorted by name so merge order is
/// stable across platforms.
fn rule_files_in(dir: &Path) -> Result<Vec<PathBuf>, RuleError> {
    let io_err = |e| RuleError::Io {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("toml") {
            files.push(path);
        }
    }
    files.sort();

    tracing::debug!(dir = %dir.display(), files = files.len(), "Found rule files");
    Ok(files)
}

/// Compile the files of one rule source in order. Across those files an id
/// may appear only once; a repeat is reported against the later file.
fn load_rule_files(files: &[PathBuf]) -> Result<Vec<Rule>, RuleError> {
    let mut all: Vec<Rule> = Vec::new();
    let mut seen = HashSet::new();
    for file in files {
        for rule in load_rule_file(file)? {
            if !seen.insert(rule.id.clone()) {
                return Err(RuleError::DuplicateId {
                    id: rule.id,
                    path: file.clone(),
                });
            }
            all.push(rule);
        }
    }
    Ok(all)
}

/// Read, size-check, and compile one user rule file.
fn load_rule_file(path: &Path) -> Result<Vec<Rule>, RuleError> {
    let io_err = |e| RuleError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let metadata = std::fs::metadata(path).map_err(io_err)?;
    if metadata.len() > constants::MAX_RULE_FILE_SIZE {
        return Err(RuleError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_RULE_FILE_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(io_err)?;
    let loaded = rules::compile_rule_file(&content, path, false)?;
    tracing::info!(
        file = %path.display(),
        count = loaded.len(),
        "Loaded user rules"
    );
    Ok(loaded)
}
