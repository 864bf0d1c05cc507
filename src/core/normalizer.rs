// RedRun - core/normalizer.rs
//
// Splits raw text into numbered LogLine records and strips terminal
// escape sequences and control characters.
// Core layer: operates on an in-memory string; the platform layer reads it.

use crate::core::model::LogLine;

const ESC: char = '\u{1b}';
const BEL: char = '\u{07}';

/// Split `raw` into `LogLine`s.
///
/// CR, LF and CRLF each end one line. The empty line produced by a final
/// line ending is dropped; every other line keeps its 1-based number, so
/// reported numbers are addressable in the original file.
pub fn normalize(raw: &str) -> Vec<LogLine> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut line_number: u64 = 1;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(LogLine {
                    line_number,
                    text: strip_control(&current),
                });
                current.clear();
                line_number += 1;
            }
            _ => current.push(c),
        }
    }

    // Text after the last line ending is a line of its own; nothing after it
    // means the input ended with a newline and there is no trailing line.
    if !current.is_empty() {
        lines.push(LogLine {
            line_number,
            text: strip_control(&current),
        });
    }

    tracing::debug!(lines = lines.len(), "Normalisation complete");
    lines
}

/// Remove ANSI escape sequences and C0/DEL control characters (TAB is kept).
///
/// Handles CSI (`ESC [ params final`), OSC (`ESC ] ... BEL` or `ESC ] ... ESC \`)
/// and two-character `ESC x` sequences. A truncated sequence at the end of
/// the line is dropped.
pub fn strip_control(line: &str) -> String {
    // Fast path: most CI lines carry no control characters at all.
    if !line.chars().any(|c| c.is_control() && c != '\t') {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ESC {
            match chars.next() {
                Some('[') => {
                    // Parameter and intermediate bytes, then one final byte.
                    for next in chars.by_ref() {
                        if ('@'..='~').contains(&next) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    while let Some(next) = chars.next() {
                        if next == BEL {
                            break;
                        }
                        if next == ESC {
                            if chars.peek() == Some(&'\\') {
                                chars.next();
                            }
                            break;
                        }
                    }
                }
                // Two-character escape (or a lone ESC at end of line).
                _ => {}
            }
        } else if c == '\t' || !c.is_control() {
            out.push(c);
        }
    }

    out
}
