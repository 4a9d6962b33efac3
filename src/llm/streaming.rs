//! Server-sent-events decoding for streamed completions
//!
//! The completion endpoint streams `data: {...}` lines separated by blank
//! lines. Chunk boundaries from the HTTP body do not align with event
//! boundaries, so incoming bytes are buffered until a full line is
//! available. Handles events split across chunks, several events in one
//! chunk, and a final event without a trailing newline.

/// Incremental decoder for SSE `data:` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw body bytes; returns the payloads of every event completed
    /// by this chunk. Incomplete trailing data stays buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.push_str(&String::from_utf8_lossy(bytes));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            if let Some(payload) = data_payload(line.trim()) {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }

    /// Drain whatever is left once the stream ends; the final event may
    /// lack a trailing newline.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buf);
        rest.lines()
            .filter_map(|line| data_payload(line.trim()))
            .map(str::to_string)
            .collect()
    }
}

fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_event_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: {\"a\":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"text\"").is_empty());
        assert_eq!(decoder.push(b":\"hi\"}\n"), vec!["{\"text\":\"hi\"}"]);
    }

    #[test]
    fn multiple_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: 1\n\ndata: 2\n\n");
        assert_eq!(payloads, vec!["1", "2"]);
    }

    #[test]
    fn no_space_after_colon() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(b"data:[DONE]\n"), vec!["[DONE]"]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), vec!["tail"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b": keep-alive\n\nevent: ping\n").is_empty());
    }
}
