//! Incremental server-sent events parser
//!
//! Both completion services frame streamed output as SSE:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Bytes arrive in arbitrary chunks, so the parser buffers partial lines and
//! only emits an event once its terminating blank line has been seen.
//! - Buffer: 1MB maximum for a single unterminated line
//! - Algorithm: O(n) single pass line splitting

use crate::errors::{AnalyzerError, Result};

/// Maximum size of an unterminated line (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Sentinel payload closing a completion stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A dispatched SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Event data (multiple `data:` lines joined with `\n`)
    Data(String),

    /// Stream terminator
    Done,
}

/// Incremental SSE parser
#[derive(Debug)]
pub struct SseParser {
    /// Bytes of the current, unterminated line
    buffer: Vec<u8>,

    /// `data:` lines of the event being assembled
    data_lines: Vec<String>,

    max_buffer_size: usize,
}

impl SseParser {
    /// Create new parser with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create parser with custom line capacity
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            data_lines: Vec::new(),
            max_buffer_size,
        }
    }

    /// Add bytes and return every event completed by them
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            let line = line.strip_suffix('\r').unwrap_or(line.as_str()).to_string();
            self.process_line(&line, &mut events);
        }

        if self.buffer.len() > self.max_buffer_size {
            return Err(AnalyzerError::StreamingError(format!(
                "Buffer overflow: {} bytes without a line break exceeds maximum {}",
                self.buffer.len(),
                self.max_buffer_size
            )));
        }

        Ok(events)
    }

    /// Flush at end of stream
    ///
    /// Treats a trailing unterminated line and any pending data as a
    /// complete event.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let line = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            let line = line.strip_suffix('\r').unwrap_or(line.as_str()).to_string();
            self.process_line(&line, &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }

        // Comment / keep-alive
        if line.starts_with(':') {
            return;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            self.data_lines
                .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // event:, id: and retry: fields carry nothing we use
    }

    fn dispatch(&mut self, events: &mut Vec<SseEvent>) {
        if self.data_lines.is_empty() {
            return;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();

        if data.trim() == DONE_SENTINEL {
            events.push(SseEvent::Done);
        } else {
            events.push(SseEvent::Data(data));
        }
    }

}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}
