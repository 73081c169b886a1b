//! Incremental Server-Sent-Events line decoder.

/// One decoded stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SseEvent {
    /// A `data:` payload.
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Buffers raw body bytes and yields complete `data:` lines.
///
/// Splitting happens on `\n` bytes, which never occur inside a multi-byte
/// UTF-8 sequence, so chunk boundaries may fall anywhere.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Feed a body chunk, returning every event completed by it.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the body has ended without a newline.
    pub(crate) fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buf);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);

    // Comments (`: keep-alive`) and other fields carry nothing we need.
    let payload = line.strip_prefix("data:")?.trim_start();
    match payload {
        "" => None,
        "[DONE]" => Some(SseEvent::Done),
        other => Some(SseEvent::Data(other.to_string())),
    }
}
