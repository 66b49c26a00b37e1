//! Incremental decoder for `text/event-stream` bodies.

use bytes::{Buf, BytesMut};

/// Terminal payload used by OpenAI-compatible streams.
const DONE_MARKER: &str = "[DONE]";

/// One decoded server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SseEvent {
    /// A `data:` payload (multi-line payloads joined with `\n`).
    Data(String),
    /// The `[DONE]` terminator.
    Done,
}

/// Buffers body bytes and yields complete events as they arrive.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: BytesMut,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feeds raw body bytes, returning every event completed by them.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let line = self.buffer.split_to(newline);
            self.buffer.advance(1);
            let line = String::from_utf8_lossy(&line);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.accept_line(line) {
                events.push(event);
            }
        }

        events
    }

    /// Flushes a trailing event that was not followed by a blank line.
    pub(crate) fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.accept_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn accept_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_owned());
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        if payload.trim() == DONE_MARKER {
            Some(SseEvent::Done)
        } else {
            Some(SseEvent::Data(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_events_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        let events = decoder.push(b"1}\r\n\r\n: keep-alive\n\ndata: [DONE]\n\n");

        assert_eq!(
            events,
            vec![SseEvent::Data("{\"a\":1}".into()), SseEvent::Done]
        );
    }

    #[test]
    fn joins_multi_line_data() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"event: message\ndata: one\ndata: two\n\n");
        assert_eq!(events, vec![SseEvent::Data("one\ntwo".into())]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some(SseEvent::Data("tail".into())));
        assert_eq!(decoder.finish(), None);
    }
}
