//! Conversation state for the AI design panel.
//!
//! Each prompt opens a request identified by a [`RequestTicket`]. Only the
//! latest ticket may stream into the panel or finalize it, so a slow
//! response to an earlier prompt can never overwrite a newer one. Every
//! request is finalized at most once, either by [`Conversation::complete`]
//! or by [`Conversation::fail`].

use fizzle_core::document::GENERATED_NAME;
use fizzle_core::stream::AssistantReply;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown in place of a reply when a request fails.
pub const APOLOGY: &str =
    "Sorry, I encountered an error while generating your design. Please try again.";

const CANVAS_CONTEXT_HEADER: &str = "\n\nCurrent canvas content (fabricJSON):\n";

pub type MessageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignPreview {
    #[serde(rename = "fabricJSON")]
    pub document: Value,
    pub status: PreviewStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_preview: Option<DesignPreview>,
}

/// One turn as sent to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

/// Identifies one request. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("no message with id {0}")]
    NotFound(MessageId),

    #[error("message {0} carries no design preview")]
    NoPreview(MessageId),

    #[error("design in message {0} was already accepted or declined")]
    AlreadyResolved(MessageId),

    #[error("message {0} has no prompt to resend")]
    NoPrompt(MessageId),
}

#[derive(Debug)]
struct InFlight {
    ticket: RequestTicket,
    streaming: String,
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: MessageId,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Whether a request is waiting for its reply.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Text streamed so far for the current request.
    pub fn streaming_text(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|f| f.streaming.as_str())
    }

    pub fn latest_ticket(&self) -> Option<RequestTicket> {
        self.in_flight.as_ref().map(|f| f.ticket)
    }

    /// Append the user's prompt and open a request for it. Any request
    /// still in flight is superseded and its later events are ignored.
    ///
    /// `canvas_context` is the current canvas JSON; it is appended to the
    /// last user turn of the wire messages only, not to the stored message.
    pub fn begin_request(
        &mut self,
        prompt: &str,
        canvas_context: Option<&Value>,
    ) -> (RequestTicket, Vec<WireMessage>) {
        self.push_message(Role::User, prompt.to_string(), None, None);

        if let Some(old) = self.in_flight.take() {
            log::debug!("request {} superseded", old.ticket.0);
        }
        self.generation += 1;
        let ticket = RequestTicket(self.generation);
        self.in_flight = Some(InFlight {
            ticket,
            streaming: String::new(),
        });

        let mut wire: Vec<WireMessage> = self
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role,
                content: m.text.clone(),
            })
            .collect();
        if let (Some(last), Some(canvas)) = (wire.last_mut(), canvas_context) {
            match serde_json::to_string_pretty(canvas) {
                Ok(json) => {
                    last.content.push_str(CANVAS_CONTEXT_HEADER);
                    last.content.push_str(&json);
                }
                Err(e) => log::warn!("could not attach canvas context: {e}"),
            }
        }
        (ticket, wire)
    }

    /// Append a streamed fragment. Returns false when the ticket is stale.
    pub fn push_fragment(&mut self, ticket: RequestTicket, fragment: &str) -> bool {
        match self.in_flight.as_mut() {
            Some(flight) if flight.ticket == ticket => {
                flight.streaming.push_str(fragment);
                true
            }
            _ => false,
        }
    }

    /// Finalize a request with its parsed reply. Returns the new assistant
    /// message id, or `None` when the ticket is stale or already finalized.
    pub fn complete(&mut self, ticket: RequestTicket, reply: AssistantReply) -> Option<MessageId> {
        self.finish(ticket)?;
        let preview = reply.fabric_json.map(|document| DesignPreview {
            document,
            status: PreviewStatus::Pending,
        });
        Some(self.push_message(Role::Assistant, reply.answer, reply.reasoning, preview))
    }

    /// Finalize a request as failed, appending the apology message.
    pub fn fail(&mut self, ticket: RequestTicket) -> Option<MessageId> {
        self.finish(ticket)?;
        Some(self.push_message(Role::Assistant, APOLOGY.to_string(), None, None))
    }

    /// Drop the current request without a reply (e.g. user cancelled).
    pub fn cancel(&mut self, ticket: RequestTicket) -> bool {
        self.finish(ticket).is_some()
    }

    fn finish(&mut self, ticket: RequestTicket) -> Option<()> {
        if self.latest_ticket() == Some(ticket) {
            self.in_flight = None;
            Some(())
        } else {
            log::debug!("ignoring stale request {}", ticket.0);
            None
        }
    }

    /// Mark a pending preview accepted. Returns the design and the prompt
    /// that produced it.
    pub fn accept(&mut self, id: MessageId) -> Result<(Value, String), ConversationError> {
        let prompt = self
            .prompt_before(id)
            .unwrap_or_else(|| GENERATED_NAME.to_string());
        let preview = self.pending_preview(id)?;
        preview.status = PreviewStatus::Accepted;
        Ok((preview.document.clone(), prompt))
    }

    pub fn decline(&mut self, id: MessageId) -> Result<(), ConversationError> {
        self.pending_preview(id)?.status = PreviewStatus::Declined;
        Ok(())
    }

    /// Remove an assistant message and return the prompt to send again.
    pub fn retry(&mut self, id: MessageId) -> Result<String, ConversationError> {
        let index = self
            .messages
            .iter()
            .position(|m| m.id == id && m.role == Role::Assistant)
            .ok_or(ConversationError::NotFound(id))?;
        let prompt = self.prompt_before(id).ok_or(ConversationError::NoPrompt(id))?;
        self.messages.remove(index);
        Ok(prompt)
    }

    /// Forget every message and any request in flight.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.in_flight = None;
    }

    fn push_message(
        &mut self,
        role: Role,
        text: String,
        reasoning: Option<String>,
        design_preview: Option<DesignPreview>,
    ) -> MessageId {
        self.next_id += 1;
        let id = self.next_id;
        self.messages.push(Message {
            id,
            role,
            text,
            reasoning,
            design_preview,
        });
        id
    }

    /// The user message directly before `id`.
    fn prompt_before(&self, id: MessageId) -> Option<String> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        let previous = self.messages[..index].last()?;
        (previous.role == Role::User).then(|| previous.text.clone())
    }

    fn pending_preview(&mut self, id: MessageId) -> Result<&mut DesignPreview, ConversationError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(ConversationError::NotFound(id))?;
        let preview = message
            .design_preview
            .as_mut()
            .ok_or(ConversationError::NoPreview(id))?;
        if preview.status != PreviewStatus::Pending {
            return Err(ConversationError::AlreadyResolved(id));
        }
        Ok(preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn reply(answer: &str, design: Option<Value>) -> AssistantReply {
        AssistantReply {
            answer: answer.to_string(),
            reasoning: Some("because".into()),
            fabric_json: design,
        }
    }

    #[test]
    fn request_carries_history_and_canvas_context() {
        let mut chat = Conversation::new();
        let (ticket, _) = chat.begin_request("a poster", None);
        chat.complete(ticket, reply("Here you go", None));

        let canvas = json!({"objects": []});
        let (_, wire) = chat.begin_request("make it blue", Some(&canvas));
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, Role::User);
        assert_eq!(wire[1].role, Role::Assistant);
        assert_eq!(wire[1].content, "Here you go");
        assert_eq!(
            wire[2].content,
            "make it blue\n\nCurrent canvas content (fabricJSON):\n{\n  \"objects\": []\n}"
        );
        // The stored message stays clean.
        assert_eq!(chat.messages()[2].text, "make it blue");
    }

    #[test]
    fn fragments_accumulate_until_completion() {
        let mut chat = Conversation::new();
        let (ticket, _) = chat.begin_request("hi", None);
        assert!(chat.push_fragment(ticket, "{\"ans"));
        assert!(chat.push_fragment(ticket, "wer\""));
        assert_eq!(chat.streaming_text(), Some("{\"answer\""));

        let id = chat.complete(ticket, reply("hello", Some(json!({"objects": []})))).unwrap();
        assert!(!chat.is_busy());
        let message = chat.get(id).unwrap();
        assert_eq!(message.reasoning.as_deref(), Some("because"));
        assert_eq!(
            message.design_preview.as_ref().map(|p| p.status),
            Some(PreviewStatus::Pending)
        );
    }

    #[test]
    fn stale_ticket_cannot_finalize() {
        let mut chat = Conversation::new();
        let (first, _) = chat.begin_request("first", None);
        let (second, _) = chat.begin_request("second", None);
        assert!(second > first);

        assert!(!chat.push_fragment(first, "late"));
        assert_eq!(chat.complete(first, reply("old", None)), None);
        assert_eq!(chat.fail(first), None);
        assert_eq!(chat.streaming_text(), Some(""));

        assert!(chat.complete(second, reply("new", None)).is_some());
        // Finalized exactly once.
        assert_eq!(chat.fail(second), None);
        let texts: Vec<&str> = chat.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "new"]);
    }

    #[test]
    fn failure_appends_apology() {
        let mut chat = Conversation::new();
        let (ticket, _) = chat.begin_request("hi", None);
        chat.push_fragment(ticket, "partial");
        let id = chat.fail(ticket).unwrap();
        assert_eq!(chat.get(id).unwrap().text, APOLOGY);
        assert_eq!(chat.streaming_text(), None);
    }

    #[test]
    fn accept_returns_design_and_prompt_once() {
        let mut chat = Conversation::new();
        let (ticket, _) = chat.begin_request("sunset poster", None);
        let design = json!({"objects": [{"type": "rect"}]});
        let id = chat.complete(ticket, reply("done", Some(design.clone()))).unwrap();

        let (document, prompt) = chat.accept(id).unwrap();
        assert_eq!(document, design);
        assert_eq!(prompt, "sunset poster");
        assert_eq!(chat.accept(id), Err(ConversationError::AlreadyResolved(id)));
        assert_eq!(chat.decline(id), Err(ConversationError::AlreadyResolved(id)));
    }

    #[test]
    fn decline_and_missing_preview() {
        let mut chat = Conversation::new();
        let (ticket, _) = chat.begin_request("x", None);
        let plain = chat.complete(ticket, reply("no design", None)).unwrap();
        assert_eq!(chat.decline(plain), Err(ConversationError::NoPreview(plain)));
        assert_eq!(chat.decline(99), Err(ConversationError::NotFound(99)));

        let (ticket, _) = chat.begin_request("y", None);
        let id = chat.complete(ticket, reply("design", Some(json!({})))).unwrap();
        chat.decline(id).unwrap();
        assert_eq!(
            chat.get(id).and_then(|m| m.design_preview.as_ref()).map(|p| p.status),
            Some(PreviewStatus::Declined)
        );
    }

    #[test]
    fn retry_removes_reply_and_returns_prompt() {
        let mut chat = Conversation::new();
        let (ticket, _) = chat.begin_request("a logo", None);
        let id = chat.fail(ticket).unwrap();

        assert_eq!(chat.retry(id).unwrap(), "a logo");
        assert_eq!(chat.messages().len(), 1);
        let user = chat.messages()[0].id;
        assert_eq!(chat.retry(user), Err(ConversationError::NotFound(user)));
    }

    #[test]
    fn messages_serialize_with_wire_names() {
        let mut chat = Conversation::new();
        let (ticket, _) = chat.begin_request("x", None);
        chat.complete(ticket, reply("y", Some(json!({"objects": []}))));
        let value = serde_json::to_value(chat.messages()).unwrap();
        assert_eq!(value[0]["role"], json!("user"));
        assert_eq!(value[1]["designPreview"]["status"], json!("pending"));
        assert_eq!(value[1]["designPreview"]["fabricJSON"], json!({"objects": []}));
    }
}
