//! HTTP client for the design chat and generate endpoints.
//!
//! The chat endpoint streams newline-delimited `{ "text": ... }` records
//! (optionally SSE `data: ` framed). [`read_reply`] turns any byte stream of
//! that shape into display fragments plus one terminal reply, so it is
//! testable without a network.

use crate::config::ApiConfig;
use crate::error::AiError;
use fizzle_core::stream::{AssistantReply, StreamDecoder};
use fizzle_editor::conversation::WireMessage;
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [WireMessage],
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    success: bool,
    #[serde(default)]
    data: Option<GenerateData>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateData {
    #[serde(default, rename = "fabricJSON")]
    fabric_json: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    generated_at: Option<String>,
}

pub struct ChatClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ChatClient {
    pub fn new(config: ApiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| AiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// A fresh cancellation pair for one request.
    pub fn abort_pair() -> (AbortHandle, AbortRegistration) {
        AbortHandle::new_pair()
    }

    /// Send the conversation and stream the reply. `on_chunk` receives each
    /// text fragment as it arrives. A non-success status fails before any
    /// fragment is delivered. Aborting through the paired handle resolves
    /// with [`AiError::Cancelled`] and no further fragments are delivered.
    pub async fn stream_chat(
        &self,
        messages: &[WireMessage],
        abort: AbortRegistration,
        on_chunk: impl FnMut(&str),
    ) -> Result<AssistantReply, AiError> {
        let url = self.config.chat_url();
        log::debug!("POST {url} ({} messages)", messages.len());
        let request = async move {
            let response = self
                .http
                .post(url)
                .json(&ChatRequest { messages })
                .send()
                .await
                .map_err(|e| AiError::Request(e.to_string()))?;
            let response = check_status(response).await?;
            read_reply(response.bytes_stream(), on_chunk).await
        };
        abortable(request, abort).await
    }

    /// One-shot generation from a description. Returns the raw design JSON
    /// (an object or a list of objects) for the document applier.
    pub async fn generate(&self, description: &str) -> Result<Value, AiError> {
        let url = self.config.generate_url();
        log::debug!("POST {url}");
        let response = self
            .http
            .post(url)
            .json(&GenerateRequest { description })
            .send()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;
        let response = check_status(response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;
        parse_generate_response(&text)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    log::warn!("design API answered {status}");
    Err(AiError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Run `request` until it finishes or the paired handle aborts it.
pub async fn abortable<T>(
    request: impl Future<Output = Result<T, AiError>>,
    abort: AbortRegistration,
) -> Result<T, AiError> {
    match Abortable::new(request, abort).await {
        Ok(result) => result,
        Err(_aborted) => {
            log::debug!("request aborted");
            Err(AiError::Cancelled)
        }
    }
}

/// Decode a streamed chat body. Fragments go to `on_chunk` as soon as
/// their line is complete; the terminal reply is parsed once the body
/// ends. A transport error mid-body fails with [`AiError::Request`];
/// fragments already delivered stay delivered.
pub async fn read_reply<S, B, E>(
    body: S,
    mut on_chunk: impl FnMut(&str),
) -> Result<AssistantReply, AiError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = StreamDecoder::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| AiError::Request(e.to_string()))?;
        for fragment in decoder.push(chunk.as_ref()) {
            on_chunk(&fragment);
        }
    }

    let skipped = decoder.skipped_lines();
    let (rest, reply) = decoder.finish();
    for fragment in rest {
        on_chunk(&fragment);
    }
    if skipped > 0 {
        log::warn!("{skipped} malformed stream lines skipped");
    }
    Ok(reply?)
}

/// Validate a generate-endpoint body and pull out the design.
pub fn parse_generate_response(text: &str) -> Result<Value, AiError> {
    let response: GenerateResponse = serde_json::from_str(text)
        .map_err(|e| AiError::InvalidResponse(format!("unreadable body: {e}")))?;
    if !response.success {
        let reason = response
            .error
            .or(response.message)
            .unwrap_or_else(|| "generation failed".to_string());
        return Err(AiError::InvalidResponse(reason));
    }
    let data = response
        .data
        .ok_or_else(|| AiError::InvalidResponse("missing data".into()))?;
    match data.fabric_json {
        Some(design) if design.is_object() || design.is_array() => {
            log::debug!(
                "generated design for {:?} at {}",
                data.description.as_deref().unwrap_or(""),
                data.generated_at.as_deref().unwrap_or("unknown time")
            );
            Ok(design)
        }
        _ => Err(AiError::InvalidResponse("missing fabricJSON design".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn generate_response_yields_design() {
        let body = json!({
            "success": true,
            "data": {
                "fabricJSON": [{"objects": [], "width": 100, "height": 100}],
                "description": "a badge",
                "generatedAt": "2024-05-01T10:00:00Z"
            }
        });
        let design = parse_generate_response(&body.to_string()).unwrap();
        assert_eq!(design[0]["width"], json!(100));
    }

    #[test]
    fn generate_failures() {
        for (body, needle) in [
            (json!({"success": false, "error": "quota"}), "quota"),
            (json!({"success": false}), "generation failed"),
            (json!({"success": true}), "missing data"),
            (json!({"success": true, "data": {"fabricJSON": null}}), "missing fabricJSON"),
            (json!({"success": true, "data": {"fabricJSON": "x"}}), "missing fabricJSON"),
        ] {
            match parse_generate_response(&body.to_string()) {
                Err(AiError::InvalidResponse(reason)) => {
                    assert!(reason.contains(needle), "{reason} lacks {needle}")
                }
                other => panic!("expected InvalidResponse for {body}, got {other:?}"),
            }
        }
        assert!(matches!(
            parse_generate_response("<html>"),
            Err(AiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn chat_request_wire_shape() {
        let messages = vec![WireMessage {
            role: fizzle_editor::Role::User,
            content: "hi".into(),
        }];
        let body = serde_json::to_value(ChatRequest { messages: &messages }).unwrap();
        assert_eq!(body, json!({"messages": [{"role": "user", "content": "hi"}]}));
    }

    #[test]
    fn client_builds_from_default_config() {
        let client = ChatClient::new(ApiConfig::default()).unwrap();
        assert_eq!(client.config().chat_url(), "http://localhost:3000/groq/chat");
    }
}
