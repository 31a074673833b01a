//! Streaming reply decoder.
//!
//! Turns the chunked body of the design chat endpoint into display
//! fragments plus one terminal structured reply.
//!
//! Wire format: newline-delimited JSON records `{"text": "..."}`, each
//! optionally prefixed with `data: ` and optionally followed by a
//! `data: [DONE]` sentinel. The concatenated `text` fields form one JSON
//! document `{answer, reasoning?, fabric_json?}`.
//!
//! The decoder is synchronous and owns all of its buffers, so one decoder
//! per request keeps requests fully independent. Chunk boundaries may fall
//! anywhere, including inside a UTF-8 sequence.

use serde::Deserialize;
use serde_json::Value;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// The terminal parse of a stream failed. Fragments already delivered to
/// the display stay delivered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("stream parse failed: {reason}")]
pub struct StreamParseError {
    pub reason: String,
    /// The full concatenated text, for diagnostics.
    pub raw: String,
}

/// The structured reply carried by a completed stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub answer: String,
    pub reasoning: Option<String>,
    /// Proposed scene document, in any shape the applier accepts.
    pub fabric_json: Option<Value>,
}

#[derive(Deserialize)]
struct Fragment {
    text: String,
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default, alias = "fabricJSON")]
    fabric_json: Option<Value>,
}

#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending_bytes: Vec<u8>,
    /// Text after the last newline seen so far.
    line_buf: String,
    /// Everything shown to the user so far.
    display: String,
    /// Concatenation reserved for the terminal parse.
    transcript: String,
    skipped_lines: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk. Returns the text fragments it completed,
    /// in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode_utf8(chunk);
        self.push_str(&text)
    }

    /// Feed already-decoded text.
    pub fn push_str(&mut self, text: &str) -> Vec<String> {
        self.line_buf.push_str(text);
        let Some(last_newline) = self.line_buf.rfind('\n') else {
            return Vec::new();
        };
        let tail = self.line_buf.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.line_buf, tail);

        complete
            .split('\n')
            .filter_map(|line| self.process_line(line))
            .collect()
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    /// Lines that were dropped because they did not parse.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Flush whatever is left and run the terminal parse. Returns the
    /// fragments completed by the flush alongside the result.
    pub fn finish(mut self) -> (Vec<String>, Result<AssistantReply, StreamParseError>) {
        let mut fragments = Vec::new();
        if !self.pending_bytes.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.pending_bytes.clear();
            self.line_buf.push_str(&rest);
        }
        let last = std::mem::take(&mut self.line_buf);
        if let Some(fragment) = self.process_line(&last) {
            fragments.push(fragment);
        }
        (fragments, parse_reply(self.transcript))
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        self.pending_bytes.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending_bytes.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending_bytes[..valid]));
                    match e.error_len() {
                        // Invalid sequence: replace it and keep going.
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.drain(..valid + len);
                        }
                        // Truncated sequence: wait for the next chunk.
                        None => {
                            self.pending_bytes.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            return None;
        }
        let payload = match line.strip_prefix(DATA_PREFIX) {
            Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
            None => line,
        };
        if payload.trim() == DONE_SENTINEL {
            return None;
        }

        match serde_json::from_str::<Fragment>(payload) {
            Ok(Fragment { text }) => {
                self.display.push_str(&text);
                self.transcript.push_str(&text);
                Some(text)
            }
            Err(e) => {
                log::warn!("skipping unparseable stream line {line:?}: {e}");
                self.skipped_lines += 1;
                None
            }
        }
    }
}

/// Parse the concatenated stream text as one reply document.
pub fn parse_reply(raw: String) -> Result<AssistantReply, StreamParseError> {
    let fail = |reason: String, raw: String| {
        log::error!("terminal stream parse failed ({reason}); raw payload: {raw}");
        Err(StreamParseError { reason, raw })
    };

    if raw.trim().is_empty() {
        return fail("no response data received".into(), raw);
    }
    let reply = match serde_json::from_str::<WireReply>(&raw) {
        Ok(reply) => reply,
        Err(e) => return fail(format!("invalid JSON: {e}"), raw),
    };
    match reply.answer {
        Some(answer) if !answer.is_empty() => Ok(AssistantReply {
            answer,
            reasoning: reply.reasoning.filter(|r| !r.is_empty()),
            fabric_json: reply.fabric_json.filter(|v| !v.is_null()),
        }),
        _ => fail("missing answer".into(), raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(text: &str) -> String {
        format!("data: {}\n", json!({ "text": text }))
    }

    #[test]
    fn token_split_across_chunks() {
        let mut decoder = StreamDecoder::new();
        let mut shown = decoder.push(br#"data: {"text":"{\"answ"#);
        assert!(shown.is_empty());
        shown.extend(decoder.push(b"er\\\":\\\"hi\\\"}\"}\n"));
        let (rest, reply) = decoder.finish();
        assert!(rest.is_empty());
        assert_eq!(shown, vec![r#"{"answer":"hi"}"#.to_string()]);
        assert_eq!(reply.unwrap().answer, "hi");
    }

    #[test]
    fn fragments_concatenate_across_lines() {
        let mut decoder = StreamDecoder::new();
        let mut shown = decoder.push(record("{\"answ").as_bytes());
        shown.extend(decoder.push(record("er\":\"hi\"}").as_bytes()));
        shown.extend(decoder.push(b"data: [DONE]\n"));
        assert_eq!(shown, vec!["{\"answ".to_string(), "er\":\"hi\"}".to_string()]);
        assert_eq!(decoder.display(), r#"{"answer":"hi"}"#);
        assert_eq!(decoder.finish().1.unwrap().answer, "hi");
    }

    #[test]
    fn bare_lines_without_prefix() {
        let mut decoder = StreamDecoder::new();
        decoder.push(b"{\"text\":\"{\\\"answer\\\":\\\"ok\\\",\\\"reasoning\\\":\\\"because\\\"}\"}\r\n");
        let reply = decoder.finish().1.unwrap();
        assert_eq!(reply.answer, "ok");
        assert_eq!(reply.reasoning.as_deref(), Some("because"));
        assert_eq!(reply.fabric_json, None);
    }

    #[test]
    fn trailing_line_without_newline_is_flushed() {
        let mut decoder = StreamDecoder::new();
        let body = record(r#"{"answer":"done","fabric_json":{"objects":[]}}"#);
        assert!(decoder.push(body.trim_end().as_bytes()).is_empty());
        let (flushed, reply) = decoder.finish();
        assert_eq!(flushed.len(), 1);
        assert_eq!(reply.unwrap().fabric_json, Some(json!({"objects": []})));
    }

    #[test]
    fn corrupt_line_is_skipped() {
        let mut decoder = StreamDecoder::new();
        decoder.push(record("{\"answer\":").as_bytes());
        decoder.push(b"data: {\"text\": broken\n");
        decoder.push(record("\"still fine\"}").as_bytes());
        assert_eq!(decoder.skipped_lines(), 1);
        assert_eq!(decoder.finish().1.unwrap().answer, "still fine");
    }

    #[test]
    fn multibyte_characters_split_between_chunks() {
        let body = record(r#"{"answer":"café ✓"}"#);
        let bytes = body.as_bytes();
        let split = body.find('é').unwrap() + 1;
        let mut decoder = StreamDecoder::new();
        decoder.push(&bytes[..split]);
        decoder.push(&bytes[split..]);
        assert_eq!(decoder.finish().1.unwrap().answer, "café ✓");
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut decoder = StreamDecoder::new();
        let mut line = b"{\"text\":\"a".to_vec();
        line.push(0xFF);
        line.extend_from_slice(b"b\"}\n");
        let shown = decoder.push(&line);
        assert_eq!(shown, vec!["a\u{FFFD}b".to_string()]);
    }

    #[test]
    fn empty_stream_fails() {
        let (_, reply) = StreamDecoder::new().finish();
        let err = reply.unwrap_err();
        assert_eq!(err.reason, "no response data received");
        assert_eq!(err.raw, "");
    }

    #[test]
    fn missing_answer_fails_with_raw_text() {
        let mut decoder = StreamDecoder::new();
        decoder.push(record(r#"{"reasoning":"thinking"}"#).as_bytes());
        let err = decoder.finish().1.unwrap_err();
        assert_eq!(err.reason, "missing answer");
        assert_eq!(err.raw, r#"{"reasoning":"thinking"}"#);
    }

    #[test]
    fn non_json_transcript_fails() {
        let mut decoder = StreamDecoder::new();
        decoder.push(record("plain words").as_bytes());
        let err = decoder.finish().1.unwrap_err();
        assert!(err.reason.starts_with("invalid JSON"));
        assert_eq!(err.raw, "plain words");
    }
}
