//! Integration tests: streamed chat bodies through `read_reply`, with
//! cancellation and mid-body transport failures.
//!
//! Bodies are synthetic `futures::stream::iter` streams; nothing touches the
//! network.

use fizzle_ai::{AbortHandle, AiError, abortable, read_reply};
use fizzle_editor::{Conversation, conversation::PreviewStatus};
use futures::stream::{self, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::RefCell;

// ─── Helpers ─────────────────────────────────────────────────────────────

/// An SSE body carrying `reply` split into `pieces` text records, cut into
/// `chunk` byte pieces.
fn sse_chunks(reply: &serde_json::Value, pieces: usize, chunk: usize) -> (Vec<Vec<u8>>, Vec<String>) {
    let text = reply.to_string();
    let chars: Vec<char> = text.chars().collect();
    let fragments: Vec<String> = chars
        .chunks(chars.len().div_ceil(pieces))
        .map(|c| c.iter().collect())
        .collect();
    let mut body = String::new();
    for fragment in &fragments {
        body.push_str(&format!("data: {}\n", json!({ "text": fragment })));
    }
    body.push_str("data: [DONE]\n");
    let chunks = body.as_bytes().chunks(chunk).map(<[u8]>::to_vec).collect();
    (chunks, fragments)
}

fn ok_stream(chunks: Vec<Vec<u8>>) -> impl futures::Stream<Item = Result<Vec<u8>, String>> {
    stream::iter(chunks.into_iter().map(Ok))
}

fn reply_json() -> serde_json::Value {
    json!({
        "reasoning": "Bold type on a dark field.",
        "answer": "A night-market flyer.",
        "fabric_json": {"objects": [{"type": "rect", "width": 10, "height": 10}], "width": 500, "height": 700}
    })
}

// ─── Streaming ───────────────────────────────────────────────────────────

#[tokio::test]
async fn fragments_are_delivered_in_order_and_reply_parsed() {
    let (chunks, fragments) = sse_chunks(&reply_json(), 5, 7);
    let mut shown = Vec::new();
    let reply = read_reply(ok_stream(chunks), |f| shown.push(f.to_string()))
        .await
        .unwrap();
    assert_eq!(shown, fragments);
    assert_eq!(reply.answer, "A night-market flyer.");
    assert_eq!(reply.reasoning.as_deref(), Some("Bold type on a dark field."));
    assert_eq!(reply.fabric_json.unwrap()["width"], json!(500));
}

#[tokio::test]
async fn transport_error_mid_body_keeps_delivered_fragments() {
    let (chunks, fragments) = sse_chunks(&reply_json(), 4, 1024);
    let body = String::from_utf8(chunks.concat()).unwrap();
    let first_line = body.lines().next().unwrap().to_string() + "\n";

    let items: Vec<Result<Vec<u8>, String>> = vec![
        Ok(first_line.into_bytes()),
        Err("connection reset".to_string()),
    ];
    let mut shown = Vec::new();
    let err = read_reply(stream::iter(items), |f| shown.push(f.to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Request(ref m) if m == "connection reset"));
    assert_eq!(shown, vec![fragments[0].clone()]);
}

#[tokio::test]
async fn unparsable_reply_is_a_stream_error() {
    let body = b"{\"text\":\"{\\\"reasoning\\\":\\\"x\\\"}\"}\n".to_vec();
    let err = read_reply(ok_stream(vec![body]), |_| {}).await.unwrap_err();
    match err {
        AiError::Stream(e) => assert_eq!(e.raw, r#"{"reasoning":"x"}"#),
        other => panic!("expected stream error, got {other:?}"),
    }
}

// ─── Cancellation ────────────────────────────────────────────────────────

#[tokio::test]
async fn abort_before_start_fires_no_callback() {
    let (chunks, _) = sse_chunks(&reply_json(), 3, 16);
    let (handle, registration) = AbortHandle::new_pair();
    handle.abort();
    let mut calls = 0;
    let result = abortable(read_reply(ok_stream(chunks), |_| calls += 1), registration).await;
    assert!(matches!(result, Err(AiError::Cancelled)));
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn abort_mid_stream_stops_callbacks() {
    let (chunks, fragments) = sse_chunks(&reply_json(), 6, 4096);
    let body = String::from_utf8(chunks.concat()).unwrap();
    let lines: Vec<Vec<u8>> = body.lines().map(|l| format!("{l}\n").into_bytes()).collect();
    assert!(lines.len() > 2);

    // Each line arrives on its own poll.
    let slow = stream::iter(lines).then(|line| async move {
        tokio::task::yield_now().await;
        Ok::<_, String>(line)
    });

    let (handle, registration) = AbortHandle::new_pair();
    let shown = RefCell::new(Vec::new());
    let result = abortable(
        read_reply(slow, |f| {
            shown.borrow_mut().push(f.to_string());
            handle.abort();
        }),
        registration,
    )
    .await;
    assert!(matches!(result, Err(AiError::Cancelled)));
    assert_eq!(shown.into_inner(), vec![fragments[0].clone()]);
}

// ─── Conversation wiring ─────────────────────────────────────────────────

#[tokio::test]
async fn streamed_reply_lands_in_the_conversation() {
    let mut chat = Conversation::new();
    let (ticket, wire) = chat.begin_request("flyer please", Some(&json!({"objects": []})));
    assert_eq!(wire.len(), 1);

    let (chunks, fragments) = sse_chunks(&reply_json(), 4, 9);
    let chat = RefCell::new(chat);
    let reply = read_reply(ok_stream(chunks), |f| {
        chat.borrow_mut().push_fragment(ticket, f);
    })
    .await
    .unwrap();
    let mut chat = chat.into_inner();
    assert_eq!(chat.streaming_text(), Some(fragments.concat().as_str()));

    let id = chat.complete(ticket, reply).unwrap();
    let message = chat.get(id).unwrap();
    assert_eq!(
        message.design_preview.as_ref().map(|p| p.status),
        Some(PreviewStatus::Pending)
    );
    let (_, prompt) = chat.accept(id).unwrap();
    assert_eq!(prompt, "flyer please");
}
