// RedRun - core/detector.rs
//
// Signal detection: a single left-to-right scan over normalised lines that
// opens a signal at every trigger line and folds the continuation lines
// (stack frames, "Caused by", indented detail) that follow it.
// Core layer: pure logic, no I/O.

use crate::core::model::{ErrorSignal, LogLine, Severity};
use crate::util::constants;
use regex::Regex;
use std::sync::OnceLock;

/// Configuration for signal detection.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Maximum physical lines folded into one signal.
    pub max_signal_lines: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_signal_lines: constants::DEFAULT_MAX_SIGNAL_LINES,
        }
    }
}

// =============================================================================
// Patterns
// =============================================================================

struct Patterns {
    /// Leading ISO-ish date/time stamp.
    timestamp: Regex,
    /// First bare word, optionally opened by `<` or `(`.
    leading_word: Regex,
    /// Severity-bearing words anywhere on the line.
    trigger_token: Regex,
    /// `SomeException:`, `Error:`, bare trailing exception names, panics.
    exception_syntax: Regex,
    /// A line that is only an exception name with optional message.
    exception_line: Regex,
    /// `... 12 more` / `... 3 common frames omitted`.
    elided_frames: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        // Patterns are fixed and exercised by the unit tests below, so a
        // mistake shows up as a failing test rather than a runtime panic.
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("detector: invalid built-in regex")
        }

        Patterns {
            timestamp: re(concat!(
                r"^(?:\d{4}[-/]\d{2}[-/]\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2})?(?:[.,]\d+)?)?",
                r"|\d{2}:\d{2}:\d{2}(?:[.,]\d+)?)",
                r"(?:Z|[+-]\d{2}:?\d{2})?",
            )),
            leading_word: re(r"^[<(]?(?P<word>[A-Za-z]+)\b"),
            trigger_token: re(
                r"(?i)\b(?P<tok>error|fatal|critical|exception|fail|failed|failure|traceback)\b|\bnpm\s+ERR!",
            ),
            exception_syntax: re(r"[\w$]*(?:Exception|Error)(?::|\s*$)|\bpanicked at\b"),
            exception_line: re(
                r"^\s*(?:[\w$]+\.)*[\w$]+(?:Exception|Error|Interrupt|Exit)(?::.*|\s*)$",
            ),
            elided_frames: re(r"^\.\.\.\s*\d+\s+(?:more|common frames omitted)"),
        }
    })
}

// =============================================================================
// Trigger predicates
// =============================================================================

/// Level found at the start of a line (after framework prefixes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExplicitLevel {
    /// INFO, DEBUG, TRACE and friends; such lines never open a signal.
    Quiet,
    Severity(Severity),
}

/// Level of a line: the first level word after an optional timestamp, an
/// optional `##` marker and any bracketed groups (`[main]`, `[2024-...]`).
/// A bracketed group that is itself a level word (`[ERROR]`) wins.
fn explicit_level(text: &str) -> Option<ExplicitLevel> {
    let pats = patterns();
    let mut rest = text.trim_start();
    if let Some(m) = pats.timestamp.find(rest) {
        rest = rest[m.end()..].trim_start();
    }
    rest = rest.strip_prefix("##").unwrap_or(rest);

    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        if let Some(level) = level_word(&inner[..close]) {
            return Some(level);
        }
        rest = inner[close + 1..].trim_start();
    }

    let caps = pats.leading_word.captures(rest)?;
    level_word(caps.name("word")?.as_str())
}

fn level_word(word: &str) -> Option<ExplicitLevel> {
    let word = word.trim().to_ascii_lowercase();
    let level = match word.as_str() {
        "fatal" | "emerg" | "emergency" | "alert" | "panic" => {
            ExplicitLevel::Severity(Severity::Fatal)
        }
        "critical" | "crit" => ExplicitLevel::Severity(Severity::Critical),
        "error" | "err" | "severe" => ExplicitLevel::Severity(Severity::Error),
        "warn" | "warning" => ExplicitLevel::Severity(Severity::Warn),
        "info" | "debug" | "trace" | "notice" | "verbose" | "fine" => ExplicitLevel::Quiet,
        _ => return None,
    };
    Some(level)
}

/// Strongest severity implied by trigger tokens and exception syntax.
fn strongest_token(text: &str) -> Option<Severity> {
    let pats = patterns();
    let mut best: Option<Severity> = None;

    let mut consider = |sev: Severity| {
        if best.map_or(true, |b| b.is_weaker_than(sev)) {
            best = Some(sev);
        }
    };

    for caps in pats.trigger_token.captures_iter(text) {
        let sev = match caps.name("tok") {
            Some(tok) => match tok.as_str().to_ascii_lowercase().as_str() {
                "fatal" => Severity::Fatal,
                "critical" => Severity::Critical,
                "error" | "exception" | "traceback" => Severity::Error,
                _ => Severity::Unknown, // fail / failed / failure
            },
            None => Severity::Error, // npm ERR!
        };
        consider(sev);
    }

    if pats.exception_syntax.is_match(text) {
        consider(Severity::Error);
    }

    best
}

/// Decide whether `text` opens a signal, and with which severity.
///
/// Quiet-level lines (INFO/DEBUG/...) never trigger. An explicit
/// FATAL/CRITICAL/ERROR level triggers with that severity. Otherwise the
/// line needs a trigger token or exception syntax; a WARN prefix then sets
/// the severity, else the strongest token does.
pub fn trigger_severity(text: &str) -> Option<Severity> {
    let level = explicit_level(text);
    match level {
        Some(ExplicitLevel::Quiet) => return None,
        Some(ExplicitLevel::Severity(sev)) if !sev.is_weaker_than(Severity::Error) => {
            return Some(sev)
        }
        _ => {}
    }

    let token = strongest_token(text)?;
    match level {
        Some(ExplicitLevel::Severity(Severity::Warn)) => Some(Severity::Warn),
        _ => Some(token),
    }
}

// =============================================================================
// Continuation predicates
// =============================================================================

/// Leading whitespace width, counting a tab as four columns.
pub fn indent_width(text: &str) -> usize {
    text.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn is_deeper_indented(line: &str, trigger_indent: usize) -> bool {
    !line.trim().is_empty() && indent_width(line) > trigger_indent
}

/// Known stack-frame and chained-exception prefixes.
fn has_frame_prefix(line: &str) -> bool {
    const PREFIXES: &[&str] = &[
        "at ",
        "File \"",
        "Caused by:",
        "Suppressed:",
        "Traceback (most recent call last)",
        "During handling of the above exception",
        "The above exception was the direct cause",
    ];
    let trimmed = line.trim_start();
    PREFIXES.iter().any(|p| trimmed.starts_with(p))
        || patterns().elided_frames.is_match(trimmed)
}

/// An exception-name line (`ValueError: bad`, `java.io.IOException`) that
/// directly follows a non-blank line of the open signal.
fn is_exception_tail(line: &str, prev: &str) -> bool {
    !prev.trim().is_empty() && patterns().exception_line.is_match(line)
}

/// True when `line` continues the signal whose last line is `prev` and whose
/// trigger line was indented by `trigger_indent` columns.
pub fn is_continuation(line: &str, prev: &str, trigger_indent: usize) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    is_deeper_indented(line, trigger_indent)
        || has_frame_prefix(line)
        || is_exception_tail(line, prev)
}

// =============================================================================
// Detection
// =============================================================================

/// Scan `lines` once and return the detected signals in input order.
pub fn detect(lines: &[LogLine], config: &DetectorConfig) -> Vec<ErrorSignal> {
    let max_lines = config.max_signal_lines.max(1);
    let mut signals = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let trigger = &lines[i];
        let Some(severity) = trigger_severity(&trigger.text) else {
            i += 1;
            continue;
        };

        let trigger_indent = indent_width(&trigger.text);
        let mut end = i;
        while end + 1 < lines.len()
            && end + 1 - i < max_lines
            && is_continuation(&lines[end + 1].text, &lines[end].text, trigger_indent)
        {
            end += 1;
        }

        let raw_text = lines[i..=end]
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        tracing::trace!(
            start = trigger.line_number,
            end = lines[end].line_number,
            severity = %severity,
            text = crate::util::logging::preview(&trigger.text),
            "Signal detected"
        );

        signals.push(ErrorSignal {
            start_line: trigger.line_number,
            end_line: lines[end].line_number,
            severity,
            raw_text,
        });

        i = end + 1;
    }

    tracing::debug!(
        lines = lines.len(),
        signals = signals.len(),
        "Signal detection complete"
    );

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalizer::normalize;

    fn detect_str(raw: &str) -> Vec<ErrorSignal> {
        detect(&normalize(raw), &DetectorConfig::default())
    }

    #[test]
    fn test_level_prefix_formats() {
        assert_eq!(trigger_severity("ERROR: build failed"), Some(Severity::Error));
        assert_eq!(
            trigger_severity("[2024-01-15 10:30:45] FATAL: out of memory"),
            Some(Severity::Fatal)
        );
        assert_eq!(
            trigger_severity("2024-01-15T10:30:45.123Z CRITICAL disk full"),
            Some(Severity::Critical)
        );
        assert_eq!(
            trigger_severity("12:00:01 [main] [ERROR] boom"),
            Some(Severity::Error)
        );
        assert_eq!(
            trigger_severity("##[error]Process completed with exit code 1."),
            Some(Severity::Error)
        );
    }

    #[test]
    fn test_quiet_levels_never_trigger() {
        assert_eq!(trigger_severity("INFO: retrying after error"), None);
        assert_eq!(trigger_severity("[DEBUG] exception handler installed"), None);
        assert_eq!(trigger_severity("2024-01-15 10:30:45 INFO Request processed"), None);
    }

    #[test]
    fn test_tokens_without_level_prefix() {
        assert_eq!(trigger_severity("Build FAILED in 3s"), Some(Severity::Unknown));
        assert_eq!(
            trigger_severity("java.lang.IllegalStateException: boom"),
            Some(Severity::Error)
        );
        assert_eq!(
            trigger_severity("FAILED tests/test_api.py::test_login - AssertionError: 401"),
            Some(Severity::Error)
        );
        assert_eq!(
            trigger_severity("npm ERR! code E404"),
            Some(Severity::Error)
        );
        assert_eq!(
            trigger_severity("thread 'main' panicked at src/main.rs:4:5:"),
            Some(Severity::Error)
        );
        assert_eq!(trigger_severity("Compiling redrun v1.0.0"), None);
        assert_eq!(trigger_severity("error_count=0 warnings=2"), None);
    }

    #[test]
    fn test_warn_prefix_keeps_warn_severity() {
        assert_eq!(
            trigger_severity("WARN: build failed, falling back"),
            Some(Severity::Warn)
        );
        assert_eq!(
            trigger_severity("WARNING: error in optional step"),
            Some(Severity::Warn)
        );
        assert_eq!(trigger_severity("WARNING: deprecated flag"), None);
    }

    #[test]
    fn test_java_stack_trace_is_one_signal() {
        let raw = "\
2024-01-15 10:30:45 INFO Starting
java.lang.IllegalStateException: Connection pool closed
\tat com.example.db.Pool.get(Pool.java:42)
\tat com.example.db.Repo.find(Repo.java:17)
\tat com.example.api.Handler.handle(Handler.java:88)
\tat com.example.api.Server.dispatch(Server.java:120)
\tat java.base/java.lang.Thread.run(Thread.java:833)
2024-01-15 10:30:46 INFO Shutting down
";
        let signals = detect_str(raw);
        assert_eq!(signals.len(), 1, "got {signals:?}");
        let s = &signals[0];
        assert_eq!(s.start_line, 2);
        assert_eq!(s.end_line, s.start_line + 5);
        assert_eq!(s.severity, Severity::Error);
        assert!(s.raw_text.contains("Thread.java:833"));
    }

    #[test]
    fn test_caused_by_and_elided_frames_fold() {
        let raw = "\
ERROR Request failed
java.lang.RuntimeException: wrapper
    at a.B.c(B.java:1)
Caused by: java.sql.SQLException: deadlock detected
    at d.E.f(E.java:2)
    ... 12 more
next unrelated line
";
        let signals = detect_str(raw);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].start_line, 1);
        assert_eq!(signals[0].end_line, 6);
    }

    #[test]
    fn test_python_traceback_folds_exception_tail() {
        let raw = "\
Traceback (most recent call last):
  File \"app.py\", line 10, in <module>
    main()
  File \"app.py\", line 6, in main
    raise ValueError(\"bad input\")
ValueError: bad input
Done.
";
        let signals = detect_str(raw);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].end_line, 6);
        assert!(signals[0].raw_text.ends_with("ValueError: bad input"));
    }

    #[test]
    fn test_blank_line_ends_signal() {
        let raw = "ERROR: first\n    detail\n\n    orphan indented\n";
        let signals = detect_str(raw);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].end_line, 2);
    }

    #[test]
    fn test_consecutive_triggers_are_separate_signals() {
        let raw = "ERROR: one\nERROR: two\nFATAL: three\n";
        let signals = detect_str(raw);
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[2].severity, Severity::Fatal);
    }

    #[test]
    fn test_max_signal_lines_caps_folding() {
        let mut raw = String::from("ERROR: deep\n");
        for i in 0..10 {
            raw.push_str(&format!("    frame {i}\n"));
        }
        let config = DetectorConfig { max_signal_lines: 4 };
        let signals = detect(&normalize(&raw), &config);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].line_count(), 4);
    }

    #[test]
    fn test_signals_never_overlap() {
        let raw = "ERROR a\n  at x\nERROR b\n  at y\n  at z\nplain\nFAILED c\n";
        let signals = detect_str(raw);
        for pair in signals.windows(2) {
            assert!(pair[0].end_line < pair[1].start_line);
        }
        assert!(signals.iter().all(|s| !s.raw_text.is_empty()));
    }

    #[test]
    fn test_continuation_predicates() {
        assert!(is_continuation("\tat Foo.bar(Foo.java:1)", "x", 0));
        assert!(is_continuation("  indented", "x", 0));
        assert!(!is_continuation("  same", "x", 2));
        assert!(is_continuation("Caused by: x", "x", 0));
        assert!(is_continuation("... 4 more", "x", 0));
        assert!(is_continuation("KeyError: 'id'", "  frame", 0));
        assert!(!is_continuation("Error: generic", "x", 0));
        assert!(!is_continuation("", "x", 0));
    }
}
