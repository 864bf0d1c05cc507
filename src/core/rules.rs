// RedRun - core/rules.rs
//
// Rule catalog loading, validation, and compilation.
// Core layer: accepts TOML strings, never touches the filesystem.
// I/O is handled by app::rule_mgr which feeds content here.

use crate::core::model::{Category, ErrorSignal, Severity};
use crate::util::constants;
use crate::util::error::RuleError;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Pseudo-path used in diagnostics for the embedded catalog.
pub const BUILTIN_RULES_PATH: &str = "<builtin>/builtin.toml";

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw rule file: a sequence of `[[rule]]` tables.
#[derive(Debug, Deserialize, Default)]
pub struct RuleFile {
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleDefinition>,
}

/// Raw `[[rule]]` table as deserialized from TOML.
///
/// Required fields are `Option` so a missing one is reported as a
/// `MissingField` naming the rule rather than a generic parse error.
#[derive(Debug, Deserialize, Default)]
pub struct RuleDefinition {
    pub id: Option<String>,
    pub category: Option<String>,
    pub pattern: Option<String>,
    pub priority: Option<i64>,
    pub confidence: Option<i64>,
    /// Expected severity; defaults to `error`.
    pub severity: Option<String>,
    /// Optional constraint: the rule only fires for these severities.
    pub severities: Option<Vec<String>>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub description: String,
}

// =============================================================================
// Compiled rule
// =============================================================================

/// A validated, compiled classification rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub category: Category,
    pub pattern: Regex,
    pub priority: i32,
    pub base_confidence: u8,
    pub expected_severity: Severity,
    pub severities: Option<Vec<Severity>>,
    pub description: String,
    pub is_builtin: bool,
    /// File the rule was loaded from (or `BUILTIN_RULES_PATH`).
    pub source: PathBuf,
}

impl Rule {
    /// True when the pattern matches the signal text and the optional
    /// severity constraint admits the signal's severity.
    pub fn matches(&self, signal: &ErrorSignal) -> bool {
        let severity_ok = self
            .severities
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&signal.severity));
        severity_ok && self.pattern.is_match(&signal.raw_text)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Immutable, ordered set of rules with a precomputed evaluation order.
///
/// Evaluation order is priority descending, then declaration order. The
/// catalog is shared read-only across worker threads.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    order: Vec<usize>,
}

impl RuleCatalog {
    /// Build a catalog from rules in declaration order.
    ///
    /// Fails on duplicate ids or when the rule count exceeds `MAX_RULES`.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        if rules.len() > constants::MAX_RULES {
            return Err(RuleError::TooManyRules {
                count: rules.len(),
                max: constants::MAX_RULES,
            });
        }

        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleError::DuplicateId {
                    id: rule.id.clone(),
                    path: rule.source.clone(),
                });
            }
        }

        let mut order: Vec<usize> = (0..rules.len()).collect();
        // Stable sort: equal priorities keep declaration order.
        order.sort_by(|&a, &b| rules[b].priority.cmp(&rules[a].priority));

        Ok(Self { rules, order })
    }

    /// A catalog with no rules; every signal classifies as unmatched.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules in evaluation order.
    pub fn in_evaluation_order(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.order.iter().map(move |&i| &self.rules[i])
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Merge `overrides` into this catalog: a rule with an existing id
    /// replaces it in place, a new id is appended.
    pub fn merge(self, overrides: Vec<Rule>) -> Result<Self, RuleError> {
        let mut rules = self.rules;
        for rule in overrides {
            if let Some(pos) = rules.iter().position(|r| r.id == rule.id) {
                tracing::info!(
                    rule_id = %rule.id,
                    source = %rule.source.display(),
                    "User rule overrides existing rule"
                );
                rules[pos] = rule;
            } else {
                tracing::debug!(rule_id = %rule.id, "Added user rule");
                rules.push(rule);
            }
        }
        Self::new(rules)
    }
}

// =============================================================================
// Rule validation and compilation
// =============================================================================

/// Parse a TOML string into a `RuleFile`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_rules_toml(toml_content: &str, source_path: &Path) -> Result<RuleFile, RuleError> {
    toml::from_str(toml_content).map_err(|e| RuleError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Validate one `RuleDefinition` and compile it into a runtime `Rule`.
///
/// `position` is the 1-based index of the rule in its file, used to name
/// the rule in errors when its id is missing.
///
/// Validates:
/// - id, category, pattern, priority and confidence are present
/// - category and severities belong to the closed sets
/// - priority and confidence are within range
/// - the pattern compiles and is within the length limit
pub fn validate_and_compile(
    def: RuleDefinition,
    position: usize,
    source_path: &Path,
    is_builtin: bool,
) -> Result<Rule, RuleError> {
    let path = source_path.to_path_buf();

    let id = match def.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(RuleError::MissingField {
                path,
                rule: format!("#{position}"),
                field: "id",
            })
        }
    };

    let missing = |field: &'static str| RuleError::MissingField {
        path: path.clone(),
        rule: id.clone(),
        field,
    };

    let category_name = def
        .category
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| missing("category"))?;
    let pattern = def
        .pattern
        .filter(|p| !p.is_empty())
        .ok_or_else(|| missing("pattern"))?;
    let priority = def.priority.ok_or_else(|| missing("priority"))?;
    let confidence = def.confidence.ok_or_else(|| missing("confidence"))?;

    let category: Category = category_name
        .parse()
        .map_err(|_| RuleError::UnknownCategory {
            path: path.clone(),
            rule: id.clone(),
            value: category_name.clone(),
        })?;

    if !(constants::MIN_RULE_PRIORITY..=constants::MAX_RULE_PRIORITY).contains(&priority) {
        return Err(RuleError::InvalidPriority {
            path,
            rule: id,
            value: priority,
            min: constants::MIN_RULE_PRIORITY,
            max: constants::MAX_RULE_PRIORITY,
        });
    }

    if !(0..=constants::MAX_RULE_CONFIDENCE).contains(&confidence) {
        return Err(RuleError::InvalidConfidence {
            path,
            rule: id,
            value: confidence,
        });
    }

    let parse_severity = |value: &str| -> Result<Severity, RuleError> {
        value.parse().map_err(|_| RuleError::UnknownSeverity {
            path: path.clone(),
            rule: id.clone(),
            value: value.to_string(),
        })
    };

    let expected_severity = match def.severity.as_deref() {
        Some(s) => parse_severity(s)?,
        None => Severity::Error,
    };

    let severities = match def.severities {
        Some(list) => Some(
            list.iter()
                .map(|s| parse_severity(s))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };

    let pattern = compile_regex(&id, &pattern, def.case_sensitive, source_path)?;

    Ok(Rule {
        id,
        category,
        pattern,
        // Range-checked above, so both conversions are lossless.
        priority: priority as i32,
        base_confidence: confidence as u8,
        expected_severity,
        severities,
        description: def.description,
        is_builtin,
        source: source_path.to_path_buf(),
    })
}

/// Compile a regex pattern with length validation to prevent ReDoS.
fn compile_regex(
    rule_id: &str,
    pattern: &str,
    case_sensitive: bool,
    source_path: &Path,
) -> Result<Regex, RuleError> {
    if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
        return Err(RuleError::RegexTooLong {
            path: source_path.to_path_buf(),
            rule: rule_id.to_string(),
            length: pattern.len(),
            max_length: constants::MAX_REGEX_PATTERN_LENGTH,
        });
    }

    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| RuleError::InvalidRegex {
            path: source_path.to_path_buf(),
            rule: rule_id.to_string(),
            pattern: pattern.to_string(),
            source: e,
        })
}

/// Parse, validate and compile every rule in one TOML document.
///
/// The first invalid rule aborts the whole file; ids must be unique within
/// the file.
pub fn compile_rule_file(
    toml_content: &str,
    source_path: &Path,
    is_builtin: bool,
) -> Result<Vec<Rule>, RuleError> {
    let file = parse_rules_toml(toml_content, source_path)?;
    let mut rules = Vec::with_capacity(file.rules.len());
    let mut seen = HashSet::new();

    for (idx, def) in file.rules.into_iter().enumerate() {
        let rule = validate_and_compile(def, idx + 1, source_path, is_builtin)?;
        if !seen.insert(rule.id.clone()) {
            return Err(RuleError::DuplicateId {
                id: rule.id,
                path: source_path.to_path_buf(),
            });
        }
        rules.push(rule);
    }

    tracing::debug!(
        source = %source_path.display(),
        count = rules.len(),
        "Compiled rule file"
    );

    Ok(rules)
}

// =============================================================================
// Built-in catalog (embedded at compile time)
// =============================================================================

/// Embedded TOML content of the built-in catalog.
pub fn builtin_rules_source() -> &'static str {
    include_str!("../../rules/builtin.toml")
}

/// Load, validate and compile the built-in catalog.
///
/// A failure here is a packaging bug; it is still returned as an error so
/// the caller can report it instead of running with a partial catalog.
pub fn load_builtin_rules() -> Result<Vec<Rule>, RuleError> {
    compile_rule_file(builtin_rules_source(), Path::new(BUILTIN_RULES_PATH), true)
}

// =============================================================================
// Tests
// =============================================================================
