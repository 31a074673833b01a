//! Integration tests: streaming reply reconstruction.
//!
//! Feeds synthetic response bodies through `StreamDecoder` split at
//! arbitrary byte boundaries and checks that chunking never changes what is
//! displayed or the terminal reply.

use fizzle_core::stream::{AssistantReply, StreamDecoder, parse_reply};
use pretty_assertions::assert_eq;
use serde_json::json;

// ─── Helpers ─────────────────────────────────────────────────────────────

/// A full reply document, cut into `pieces` text records.
fn body(reply: &serde_json::Value, pieces: usize, sse: bool) -> (String, Vec<String>) {
    let text = reply.to_string();
    let chars: Vec<char> = text.chars().collect();
    let step = chars.len().div_ceil(pieces);
    let fragments: Vec<String> = chars.chunks(step).map(|c| c.iter().collect()).collect();
    let prefix = if sse { "data: " } else { "" };
    let mut out = String::new();
    for fragment in &fragments {
        out.push_str(prefix);
        out.push_str(&json!({ "text": fragment }).to_string());
        out.push('\n');
    }
    if sse {
        out.push_str("data: [DONE]\n");
    }
    (out, fragments)
}

fn decode(chunks: &[&[u8]]) -> (Vec<String>, Result<AssistantReply, fizzle_core::StreamParseError>) {
    let mut decoder = StreamDecoder::new();
    let mut shown = Vec::new();
    for chunk in chunks {
        shown.extend(decoder.push(chunk));
    }
    let (rest, reply) = decoder.finish();
    shown.extend(rest);
    (shown, reply)
}

fn sample_reply() -> serde_json::Value {
    json!({
        "reasoning": "Warm palette, big type · «Été» 🌞",
        "answer": "Here is a summer poster.",
        "fabric_json": {
            "objects": [{"type": "textbox", "text": "Été", "fontSize": 64}],
            "width": 1080,
            "height": 1080
        }
    })
}

// ─── Boundaries ──────────────────────────────────────────────────────────

#[test]
fn every_single_split_point_gives_the_same_result() {
    let reply = sample_reply();
    let (raw, fragments) = body(&reply, 7, true);
    let expected = parse_reply(reply.to_string()).unwrap();
    let bytes = raw.as_bytes();

    for split in 0..=bytes.len() {
        let (shown, result) = decode(&[&bytes[..split], &bytes[split..]]);
        assert_eq!(shown, fragments, "display differs when split at byte {split}");
        assert_eq!(result.as_ref(), Ok(&expected), "reply differs when split at byte {split}");
    }
}

#[test]
fn byte_at_a_time_feed() {
    let reply = sample_reply();
    let (raw, fragments) = body(&reply, 3, false);
    let chunks: Vec<&[u8]> = raw.as_bytes().chunks(1).collect();
    let (shown, result) = decode(&chunks);
    assert_eq!(shown.concat(), fragments.concat());
    let reply = result.unwrap();
    assert_eq!(reply.answer, "Here is a summer poster.");
    assert_eq!(
        reply.fabric_json.as_ref().and_then(|d| d.get("width")),
        Some(&json!(1080))
    );
}

#[test]
fn split_mid_token_scenario() {
    let lines = "data: {\"text\":\"{\\\"answer\\\":\\\"hi\\\"}\"}\n";
    let cut = lines.find("answ").unwrap() + 4;
    let (shown, result) = decode(&[&lines.as_bytes()[..cut], &lines.as_bytes()[cut..]]);
    assert_eq!(shown, vec![r#"{"answer":"hi"}"#.to_string()]);
    assert_eq!(result.unwrap().answer, "hi");
}

// ─── Resilience ──────────────────────────────────────────────────────────

#[test]
fn one_corrupt_line_does_not_lose_the_reply() {
    let reply = sample_reply();
    let (raw, fragments) = body(&reply, 4, true);
    let mut lines: Vec<&str> = raw.lines().collect();
    lines.insert(2, "data: {\"text\": \"unterminated");
    let corrupted = lines.join("\n");

    let (shown, result) = decode(&[corrupted.as_bytes()]);
    assert_eq!(shown, fragments);
    assert_eq!(result.unwrap(), parse_reply(reply.to_string()).unwrap());
}

#[test]
fn failed_terminal_parse_keeps_delivered_fragments() {
    let first: &[u8] = b"data: {\"text\":\"partial \"}\n";
    let second: &[u8] = b"data: {\"text\":\"answer\"}\n";
    let (shown, result) = decode(&[first, second]);
    assert_eq!(shown, vec!["partial ".to_string(), "answer".to_string()]);
    let err = result.unwrap_err();
    assert_eq!(err.raw, "partial answer");
}

#[test]
fn decoders_do_not_share_state() {
    let mut first = StreamDecoder::new();
    let mut second = StreamDecoder::new();
    first.push(b"data: {\"text\":\"{\\\"answer\\\":");
    second.push(b"data: {\"text\":\"{\\\"answer\\\":\\\"second\\\"}\"}\n");
    assert_eq!(second.finish().1.unwrap().answer, "second");
    first.push(b"\\\"first\\\"}\"}\n");
    assert_eq!(first.finish().1.unwrap().answer, "first");
}
