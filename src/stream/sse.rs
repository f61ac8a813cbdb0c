//! Incremental SSE frame parser for the upstream byte stream.
//!
//! Field semantics follow the
//! [SSE specification](https://html.spec.whatwg.org/multipage/server-sent-events.html):
//! `data:` lines accumulate (joined with `\n`), an empty line dispatches
//! the frame, `:` lines are comments, unknown fields are ignored.

use memchr::memchr_iter;

/// One dispatched SSE frame. Only the fields the translator consumes are
/// surfaced; `id:` and `retry:` are parsed and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental parser over raw text arriving at arbitrary boundaries.
pub struct SseParser {
    buffer: String,
    read_offset: usize,
    event_type: Option<String>,
    data_buffer: String,
    has_data: bool,
    utf8_carry: Vec<u8>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            read_offset: 0,
            event_type: None,
            data_buffer: String::new(),
            has_data: false,
            utf8_carry: Vec::new(),
        }
    }

    /// Feed raw bytes, holding back an incomplete UTF-8 sequence at the
    /// tail until the next feed completes it.
    pub fn feed_bytes(
        &mut self,
        bytes: &[u8],
        out: &mut Vec<SseFrame>,
    ) -> Result<(), std::str::Utf8Error> {
        let mut carry = std::mem::take(&mut self.utf8_carry);
        carry.extend_from_slice(bytes);
        let valid_len = match std::str::from_utf8(&carry) {
            Ok(_) => carry.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(err) => return Err(err),
        };
        if let Ok(text) = std::str::from_utf8(&carry[..valid_len]) {
            self.feed_into(text, out);
        }
        carry.drain(..valid_len);
        self.utf8_carry = carry;
        Ok(())
    }

    /// Feed raw text and return any frames completed by it.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseFrame> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed raw text, appending completed frames to `out`.
    pub fn feed_into(&mut self, chunk: &str, out: &mut Vec<SseFrame>) {
        self.buffer.push_str(chunk);
        let mut consumed = self.read_offset;
        let scan_start = consumed;
        let bytes = self.buffer.as_bytes();
        for rel in memchr_iter(b'\n', &bytes[scan_start..]) {
            let line_end = scan_start + rel;
            let mut line = &self.buffer[consumed..line_end];
            if let Some(stripped) = line.strip_suffix('\r') {
                line = stripped;
            }
            Self::process_line(
                line,
                &mut self.event_type,
                &mut self.data_buffer,
                &mut self.has_data,
                out,
            );
            consumed = line_end + 1;
        }

        self.read_offset = consumed;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        // Compact once the consumed prefix dominates the buffer.
        if self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2 || self.read_offset >= 8 * 1024)
        {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }

    fn process_line(
        line: &str,
        event_type: &mut Option<String>,
        data_buffer: &mut String,
        has_data: &mut bool,
        out: &mut Vec<SseFrame>,
    ) {
        if line.is_empty() {
            if *has_data {
                out.push(SseFrame {
                    event: event_type.take(),
                    data: std::mem::take(data_buffer),
                });
                *has_data = false;
            } else {
                // A frame with only an event name carries nothing.
                *event_type = None;
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            if *has_data {
                data_buffer.push('\n');
            } else {
                *has_data = true;
            }
            data_buffer.push_str(value);
        } else if let Some(value) = line.strip_prefix("event:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            *event_type = Some(value.to_owned());
        }
        // id:, retry: and unknown fields are ignored
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}
