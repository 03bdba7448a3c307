use uuid::Uuid;

use crate::content;
use crate::error::{Result, StudyMateError};

use super::message::Message;

/// The in-memory ordered transcript for one active conversation. Insertion
/// order is the display and persistence order and is never re-sorted.
///
/// The transcript never drops a user message: a failed round-trip is closed
/// out with a paired error message instead.
pub struct Transcript {
    messages: Vec<Message>,
    pending: Option<Uuid>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            pending: None,
        }
    }

    /// Append a user message. Empty or whitespace-only input is a no-op and
    /// surfaces no error.
    pub fn append_user(&mut self, text: &str) -> Option<Uuid> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let message = Message::user(trimmed);
        let id = message.id;
        self.messages.push(message);
        Some(id)
    }

    /// Run the post-processor over a raw reply and append the result.
    /// Backend-asserted sources come first, processor-extracted ones after,
    /// deduplicated.
    pub fn append_assistant(&mut self, raw_text: &str, extra_sources: &[String]) -> &Message {
        let message = build_assistant(raw_text, extra_sources);
        self.messages.push(message);
        self.messages.last().expect("just pushed")
    }

    /// Append an error message; the preceding user message is left untouched.
    pub fn append_error(&mut self, reason: &str) -> &Message {
        self.messages.push(Message::error(reason));
        self.messages.last().expect("just pushed")
    }

    /// Append the pending assistant placeholder for an in-flight request.
    /// At most one may be live at a time.
    pub fn begin_pending(&mut self) -> Result<Uuid> {
        if self.pending.is_some() {
            return Err(StudyMateError::Session(
                "a completion request is already in flight".to_string(),
            ));
        }
        let placeholder = Message::placeholder();
        let id = placeholder.id;
        self.messages.push(placeholder);
        self.pending = Some(id);
        Ok(id)
    }

    /// Replace the live placeholder with the final assistant message.
    pub fn resolve_pending(&mut self, raw_text: &str, extra_sources: &[String]) -> Result<Message> {
        let slot = self.take_pending_slot()?;
        let message = build_assistant(raw_text, extra_sources);
        self.messages[slot] = message.clone();
        Ok(message)
    }

    /// Replace the live placeholder with an error message.
    pub fn fail_pending(&mut self, reason: &str) -> Result<Message> {
        let slot = self.take_pending_slot()?;
        let message = Message::error(reason);
        self.messages[slot] = message.clone();
        Ok(message)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wholesale replacement when a persisted session is loaded. Local-only
    /// messages from the previous transcript are discarded, never merged.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.pending = None;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = None;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Snapshot for the wire: everything except the in-flight placeholder.
    pub fn completed_messages(&self) -> Vec<Message> {
        self.messages.iter().filter(|m| !m.pending).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn take_pending_slot(&mut self) -> Result<usize> {
        let id = self
            .pending
            .take()
            .ok_or_else(|| StudyMateError::Session("no completion request in flight".to_string()))?;
        self.messages
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| StudyMateError::Session("pending placeholder vanished".to_string()))
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

fn build_assistant(raw_text: &str, extra_sources: &[String]) -> Message {
    let processed = content::process(raw_text);
    let mut sources: Vec<String> = Vec::new();
    for name in extra_sources.iter().chain(processed.sources.iter()) {
        if !sources.contains(name) {
            sources.push(name.clone());
        }
    }
    Message::assistant(processed, sources)
}
