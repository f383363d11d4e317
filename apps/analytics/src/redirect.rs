//! Adapter that turns raw stream writes into log records.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::logger::Logger;
use crate::record::LogRecord;
use crate::severity::Severity;

/// Forwards text written to it into a [`Logger`], one record per line.
///
/// A line of exactly one character is held back and prefixed to the next
/// longer line instead of being logged alone. Writers on different threads
/// share the pending buffer under a lock.
pub struct StreamRedirector {
    logger: Arc<Logger>,
    level: Severity,
    line_buf: Mutex<Vec<String>>,
    /// Trailing bytes of a UTF-8 sequence cut off by the previous `write`.
    partial: Mutex<Vec<u8>>,
}

impl StreamRedirector {
    /// Redirector that logs at ERROR.
    pub fn new(logger: Arc<Logger>) -> Self {
        Self::with_level(logger, Severity::ERROR)
    }

    pub fn with_level(logger: Arc<Logger>, level: Severity) -> Self {
        Self {
            logger,
            level,
            line_buf: Mutex::new(Vec::new()),
            partial: Mutex::new(Vec::new()),
        }
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    /// Number of fragments waiting for a longer line.
    pub fn pending(&self) -> usize {
        lock(&self.line_buf).len()
    }

    pub fn write_str(&self, text: &str) {
        let mut line_buf = lock(&self.line_buf);
        for line in split_lines(text.trim_end_matches(is_space)) {
            if line.chars().count() == 1 {
                line_buf.push(line.to_string());
                continue;
            }
            let mut message = line_buf.concat();
            message.push_str(line.trim_end_matches(is_space));
            line_buf.clear();
            self.logger.emit(
                &LogRecord::new(self.level, message).with_function("write"),
            );
        }
    }

    /// Decodes `buf` after any carried-over bytes and forwards the text.
    ///
    /// An incomplete sequence at the end is kept for the next call; invalid
    /// bytes become U+FFFD.
    pub fn write_bytes(&self, buf: &[u8]) {
        let mut partial = lock(&self.partial);
        partial.extend_from_slice(buf);

        let mut text = String::new();
        let mut rest: &[u8] = &partial;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        None => {
                            rest = after;
                            break;
                        }
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                    }
                }
            }
        }
        let carried = rest.to_vec();
        *partial = carried;

        if !text.is_empty() {
            self.write_str(&text);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Whitespace as stripped from the ends of redirected text, including the
/// ASCII file/group/record/unit separators.
fn is_space(c: char) -> bool {
    c.is_whitespace() || matches!(c, '\x1c'..='\x1f')
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Splits on every line boundary, treating `\r\n` as one. A trailing
/// boundary does not produce an empty last line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..index]);
        let mut end = index + c.len_utf8();
        if c == '\r' {
            if let Some(&(next, '\n')) = chars.peek() {
                chars.next();
                end = next + 1;
            }
        }
        start = end;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

impl Write for &StreamRedirector {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for StreamRedirector {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
