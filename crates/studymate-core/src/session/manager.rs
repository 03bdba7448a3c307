use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::{Backend, SessionSummary};
use crate::conversation::{Message, Transcript};
use crate::error::Result;

const DEFAULT_TITLE: &str = "New Chat";
const TITLE_CHARS: usize = 40;

/// Persistence state of the active transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing persisted yet (also guest mode, permanently).
    NoSession,
    /// A create request is in flight; no second create may start.
    Creating,
    /// A server record exists under this id, assigned exactly once.
    Active(String),
}

/// Maps the local transcript to a lazily-created, incrementally-persisted
/// server record. Persistence is best-effort throughout: the transcript
/// stays authoritative and failures are logged and swallowed.
pub struct SessionManager {
    backend: Arc<dyn Backend>,
    transcript: Arc<Mutex<Transcript>>,
    authenticated: bool,
    state: StdMutex<SessionState>,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn Backend>,
        transcript: Arc<Mutex<Transcript>>,
        authenticated: bool,
    ) -> Self {
        Self {
            backend,
            transcript,
            authenticated,
            state: StdMutex::new(SessionState::NoSession),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().expect("state lock").clone()
    }

    pub fn session_id(&self) -> Option<String> {
        match self.state() {
            SessionState::Active(id) => Some(id),
            _ => None,
        }
    }

    /// Make sure a server record exists, creating one from the first user
    /// message if needed. Returns the session id, or None when nothing can
    /// be persisted right now (guest mode, create already in flight, or the
    /// create failed — a later message retries from scratch).
    ///
    /// The Creating guard is taken before the network call, so concurrent
    /// callers produce exactly one create request.
    pub async fn ensure_session(&self, first_user_message: &Message) -> Option<String> {
        if !self.authenticated {
            return None;
        }

        {
            let mut state = self.state.lock().expect("state lock");
            match &*state {
                SessionState::Active(id) => return Some(id.clone()),
                SessionState::Creating => return None,
                SessionState::NoSession => *state = SessionState::Creating,
            }
        }

        let title = derive_title(&first_user_message.content);
        match self.backend.create_chat(&title, first_user_message).await {
            Ok(id) => {
                let mut state = self.state.lock().expect("state lock");
                if *state == SessionState::Creating {
                    debug!(chat_id = %id, "chat session created");
                    *state = SessionState::Active(id.clone());
                    Some(id)
                } else {
                    // A load_chat jumped states while we were creating; that
                    // id wins and this turn is not persisted.
                    None
                }
            }
            Err(e) => {
                warn!("failed to create chat session: {e}");
                let mut state = self.state.lock().expect("state lock");
                if *state == SessionState::Creating {
                    *state = SessionState::NoSession;
                }
                None
            }
        }
    }

    /// Fire-and-forget persistence of a completed turn. Failures are logged
    /// and swallowed; the caller never observes them.
    pub async fn persist_turn(&self, user: Message, assistant: Message) {
        let Some(chat_id) = self.ensure_session(&user).await else {
            return;
        };
        if let Err(e) = self.backend.append_messages(&chat_id, &[user, assistant]).await {
            warn!(chat_id = %chat_id, "failed to append turn: {e}");
        }
    }

    /// Fetch a persisted session and replace the local transcript with it
    /// entirely. Unsaved local-only messages are discarded.
    pub async fn load_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        let record = self.backend.get_chat(chat_id).await?;
        {
            let mut transcript = self.transcript.lock().await;
            transcript.replace_all(record.messages.clone());
        }
        *self.state.lock().expect("state lock") = SessionState::Active(record.id);
        Ok(record.messages)
    }

    /// Session summaries for the authenticated identity; guests get an empty
    /// list without error.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        if !self.authenticated {
            return Ok(Vec::new());
        }
        self.backend.list_chats().await
    }

    /// Start over: cleared transcript, no session id.
    pub async fn reset(&self) {
        self.transcript.lock().await.clear();
        *self.state.lock().expect("state lock") = SessionState::NoSession;
    }
}

fn derive_title(content: &str) -> String {
    let title: String = content.chars().take(TITLE_CHARS).collect();
    if title.trim().is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_first_forty_chars() {
        let long = "a".repeat(100);
        assert_eq!(derive_title(&long).chars().count(), 40);
        assert_eq!(derive_title("short question"), "short question");
        assert_eq!(derive_title("   "), "New Chat");
    }
}
