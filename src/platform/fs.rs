// RedRun - platform/fs.rs
//
// Reading raw log text from files and standard input.
//
// Files at or above the large-file threshold are memory-mapped instead of
// copied into a heap buffer before decoding. Content with NUL bytes near the
// start is rejected as binary; invalid UTF-8 is decoded lossily.

use crate::util::constants;
use crate::util::error::InputError;
use std::borrow::Cow;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::time::Duration;

/// Read a whole file as text.
///
/// `is_large` selects the memory-mapped path. Transient I/O errors
/// (WouldBlock, Interrupted, TimedOut) are retried with capped backoff;
/// permanent errors are returned immediately.
pub fn read_file_text(path: &Path, is_large: bool) -> Result<String, InputError> {
    let source_name = path.display().to_string();
    let io_err = |e: io::Error| match e.kind() {
        io::ErrorKind::NotFound => InputError::NotFound {
            path: path.to_path_buf(),
        },
        _ => InputError::Io {
            source_name: source_name.clone(),
            source: e,
        },
    };

    if is_large {
        let file = std::fs::File::open(path).map_err(io_err)?;
        // SAFETY: the map is only read, never mutated. A log being rewritten
        // underneath us can yield garbled text but no writes through the map.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(io_err)?;
        tracing::debug!(file = %source_name, bytes = mmap.len(), "Read via memory map");
        return decode_text(&mmap, &source_name);
    }

    let bytes = read_with_retry(path).map_err(io_err)?;
    tracing::debug!(file = %source_name, bytes = bytes.len(), "Read file");
    decode_text(&bytes, &source_name)
}

fn read_with_retry(path: &Path) -> io::Result<Vec<u8>> {
    let mut last_err: Option<io::Error> = None;

    for (attempt, delay_ms) in constants::READ_RETRY_DELAYS_MS.iter().enumerate() {
        match std::fs::read(path) {
            Ok(bytes) => return Ok(bytes),
            Err(e) if is_transient_error(&e) => {
                tracing::debug!(
                    file = %path.display(),
                    attempt = attempt + 1,
                    error = %e,
                    "Transient I/O error, retrying"
                );
                std::thread::sleep(Duration::from_millis(*delay_ms));
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::other("Unknown read error")))
}

fn is_transient_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}

/// True when standard input is attached to an interactive terminal.
pub fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

/// Read all of standard input as text.
///
/// Refuses to block on an interactive terminal.
pub fn read_stdin_text() -> Result<String, InputError> {
    if stdin_is_terminal() {
        return Err(InputError::StdinIsTerminal);
    }
    read_text_from(io::stdin().lock(), "<stdin>")
}

/// Read everything from `reader` and decode it as text.
pub fn read_text_from<R: Read>(mut reader: R, source_name: &str) -> Result<String, InputError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| InputError::Io {
            source_name: source_name.to_string(),
            source: e,
        })?;
    decode_text(&bytes, source_name)
}

/// Decode raw bytes as text.
///
/// A NUL byte within the first `BINARY_SNIFF_BYTES` marks the content as
/// binary. Invalid UTF-8 sequences become U+FFFD; a leading BOM is dropped.
pub fn decode_text(bytes: &[u8], source_name: &str) -> Result<String, InputError> {
    let sniff = &bytes[..bytes.len().min(constants::BINARY_SNIFF_BYTES)];
    if sniff.contains(&0) {
        return Err(InputError::NonText {
            source_name: source_name.to_string(),
        });
    }

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => Ok(s.to_string()),
        Cow::Owned(s) => {
            tracing::debug!(source = source_name, "Invalid UTF-8 replaced");
            Ok(s)
        }
    }
}
