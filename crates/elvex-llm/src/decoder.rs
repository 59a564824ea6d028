//! Incremental decoder for newline-delimited JSON deltas
//!
//! The elvex stream endpoint answers with one JSON object per line, each
//! optionally carrying a `delta` string. Network chunks arrive at arbitrary
//! boundaries, so the decoder keeps two pieces of state between calls:
//!
//! - bytes of a multi-byte UTF-8 sequence cut off at the end of a chunk
//! - text received after the last newline (an incomplete line)
//!
//! Feeding the same bytes in any chunking yields the same deltas.

use serde_json::Value;
use tracing::{trace, warn};

/// Stateful line decoder for one response stream
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    buffer: String,
    /// Lines that failed to parse or had an unusable delta
    malformed: usize,
}

impl LineDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes and return the deltas of every line it completes
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        // The buffer holds no newline between calls, so only new text is scanned.
        let start = self.buffer.len();
        self.decode_utf8(bytes);

        let Some(pos) = self.buffer[start..].rfind('\n').map(|pos| start + pos) else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(pos + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        complete
            .split('\n')
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    /// Flush the decoder at end of stream
    ///
    /// Any carried partial UTF-8 sequence is decoded lossily, and a final line
    /// without a trailing newline is parsed like any other.
    pub fn finish(mut self) -> Vec<String> {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&pending));
        }

        let last = std::mem::take(&mut self.buffer);
        self.parse_line(&last).into_iter().collect()
    }

    /// Text buffered after the last newline
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Number of lines skipped as malformed so far
    pub fn malformed_lines(&self) -> usize {
        self.malformed
    }

    fn decode_utf8(&mut self, bytes: &[u8]) {
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(bytes);

        let mut rest = data.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.buffer
                        .push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end, wait for more bytes.
                            self.pending = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn parse_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                self.malformed += 1;
                warn!(line = %line, error = %e, "Skipping malformed stream line");
                return None;
            }
        };

        match value.get("delta") {
            Some(Value::String(delta)) if !delta.is_empty() => Some(delta.clone()),
            Some(Value::String(_) | Value::Null) | None => {
                trace!(line = %line, "Stream line carries no delta");
                None
            }
            Some(_) => {
                self.malformed += 1;
                warn!(line = %line, "Skipping stream line with non-string delta");
                None
            }
        }
    }
}
