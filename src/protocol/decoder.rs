use tracing::warn;

use super::event::{decode_record, StreamEvent};

/// How the backend frames records on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// One JSON `{"type", "data"}` record per line (canonical).
    #[default]
    Ndjson,
    /// Deprecated: the whole stream is plain answer text; every chunk
    /// becomes one `token` payload. Only for backends that predate the
    /// structured protocol.
    RawText,
}

/// Reassembles complete protocol records from an arbitrarily chunked byte
/// stream. Chunk boundaries carry no meaning: a record may span several
/// chunks, one chunk may hold several records, and a boundary may even fall
/// inside a multi-byte UTF-8 character. Incomplete trailing data is buffered
/// and prefixed to the next chunk, so no bytes are ever lost or seen twice.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    framing: Framing,
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: Vec::new(),
        }
    }

    /// Feed one transport chunk, returning every record it completed.
    /// A line that fails to decode is dropped with a warning; decoding
    /// continues with the next line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        if let Framing::RawText = self.framing {
            return match self.take_valid_text() {
                Some(text) => vec![StreamEvent::Token(text)],
                None => Vec::new(),
            };
        }

        let mut events = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            if let Some(event) = Self::decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush at end-of-stream: a final record is valid even without a
    /// trailing newline, and raw text emits whatever bytes remain.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.is_empty() {
            return None;
        }
        match self.framing {
            Framing::Ndjson => Self::decode_line(&rest),
            Framing::RawText => Some(StreamEvent::Token(
                String::from_utf8_lossy(&rest).into_owned(),
            )),
        }
    }

    /// Take the longest valid UTF-8 prefix of the buffer, holding back a
    /// trailing incomplete character until the rest of it arrives.
    fn take_valid_text(&mut self) -> Option<String> {
        let valid_len = match std::str::from_utf8(&self.buffer) {
            Ok(_) => self.buffer.len(),
            // error_len() is None only for a sequence cut off by the chunk
            // boundary; an actually invalid sequence won't complete, so it
            // gets replaced rather than stalling the stream.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => {
                let text = String::from_utf8_lossy(&self.buffer).into_owned();
                self.buffer.clear();
                return Some(text);
            }
        };
        if valid_len == 0 {
            return None;
        }
        let text = String::from_utf8_lossy(&self.buffer[..valid_len]).into_owned();
        self.buffer.drain(..valid_len);
        Some(text)
    }

    fn decode_line(bytes: &[u8]) -> Option<StreamEvent> {
        let line = match std::str::from_utf8(bytes) {
            Ok(s) => s.trim(),
            Err(e) => {
                warn!(error = %e, "dropping stream record with invalid utf-8");
                return None;
            }
        };
        if line.is_empty() {
            return None;
        }
        match decode_record(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "dropping malformed stream record");
                None
            }
        }
    }
}
