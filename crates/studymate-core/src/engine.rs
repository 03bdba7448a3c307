use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{Backend, HttpBackend, SessionSummary};
use crate::attachments::{AttachmentSet, UploadedAttachment};
use crate::auth::{CredentialStore, Credentials};
use crate::config::Settings;
use crate::conversation::{Message, Transcript};
use crate::error::{Result, StudyMateError};
use crate::render::{self, DiagramRenderer, NullRenderer};
use crate::session::{SessionManager, SessionState};

/// The conversation engine a frontend drives: optimistic local transcript,
/// post-processed replies, best-effort server sync, deferred diagram
/// rendering.
///
/// Identity is read from the credential store once, at construction; after a
/// login or logout the caller builds a fresh engine.
pub struct ChatEngine {
    transcript: Arc<Mutex<Transcript>>,
    attachments: StdMutex<AttachmentSet>,
    backend: Arc<dyn Backend>,
    sessions: Arc<SessionManager>,
    renderer: Arc<dyn DiagramRenderer>,
    credentials: Credentials,
    store: Arc<dyn CredentialStore>,
}

impl ChatEngine {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_attachment_set(backend, store, AttachmentSet::new())
    }

    /// Engine over the real HTTP backend, configured from settings.
    pub fn from_settings(settings: &Settings, store: Arc<dyn CredentialStore>) -> Self {
        let credentials = Credentials::from_store(store.as_ref());
        let backend =
            Arc::new(HttpBackend::from_settings(settings).with_token(credentials.token.clone()));
        let attachments = AttachmentSet::with_limits(
            settings.attachments.max_files,
            settings.attachments.max_file_bytes,
        );
        Self::with_attachment_set(backend, store, attachments)
    }

    fn with_attachment_set(
        backend: Arc<dyn Backend>,
        store: Arc<dyn CredentialStore>,
        attachments: AttachmentSet,
    ) -> Self {
        let credentials = Credentials::from_store(store.as_ref());
        let transcript = Arc::new(Mutex::new(Transcript::new()));
        let sessions = Arc::new(SessionManager::new(
            backend.clone(),
            transcript.clone(),
            credentials.is_authenticated(),
        ));
        Self {
            transcript,
            attachments: StdMutex::new(attachments),
            backend,
            sessions,
            renderer: Arc::new(NullRenderer),
            credentials,
            store,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DiagramRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    // ── One conversation turn ───────────────────────────────────────────

    /// Drive one full turn: optimistic user append, completion round-trip,
    /// post-processed assistant append (or paired error message), then
    /// fire-and-forget persistence and a deferred diagram pass.
    ///
    /// Empty input is a no-op returning `Ok(None)`. A turn submitted while
    /// another is in flight is rejected; callers are expected to disable
    /// submission while `is_busy()`.
    pub async fn send(&self, text: &str) -> Result<Option<Message>> {
        let (user_message, wire_messages) = {
            let mut transcript = self.transcript.lock().await;
            if transcript.has_pending() {
                return Err(StudyMateError::Session(
                    "a completion request is already in flight".to_string(),
                ));
            }
            let Some(user_id) = transcript.append_user(text) else {
                return Ok(None);
            };
            let user_message = transcript
                .messages()
                .iter()
                .find(|m| m.id == user_id)
                .cloned()
                .expect("just appended");
            let wire_messages = transcript.completed_messages();
            transcript.begin_pending()?;
            (user_message, wire_messages)
        };

        let attachments: Vec<UploadedAttachment> =
            self.attachments.lock().expect("attachments lock").items().to_vec();

        let outcome = self.backend.complete(&wire_messages, &attachments).await;

        let message = {
            let mut transcript = self.transcript.lock().await;
            match outcome {
                Ok(reply) => {
                    let assistant =
                        transcript.resolve_pending(&reply.response, &reply.used_sources)?;
                    let sessions = self.sessions.clone();
                    let user = user_message;
                    let persisted = assistant.clone();
                    tokio::spawn(async move {
                        sessions.persist_turn(user, persisted).await;
                    });
                    assistant
                }
                Err(e) => transcript.fail_pending(&e.to_string())?,
            }
        };

        // Deferred, best-effort: rendering never blocks message display.
        if !message.diagrams.is_empty() {
            let renderer = self.renderer.clone();
            let rendered = message.clone();
            tokio::spawn(async move {
                render::render_message(renderer.as_ref(), &rendered);
            });
        }

        Ok(Some(message))
    }

    pub async fn is_busy(&self) -> bool {
        self.transcript.lock().await.has_pending()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.transcript.lock().await.messages().to_vec()
    }

    // ── Session sync ────────────────────────────────────────────────────

    pub async fn list_chats(&self) -> Result<Vec<SessionSummary>> {
        self.sessions.list_sessions().await
    }

    pub async fn load_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.sessions.load_chat(chat_id).await
    }

    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    pub fn session_id(&self) -> Option<String> {
        self.sessions.session_id()
    }

    /// Start a fresh conversation: transcript, session id, and attachments
    /// all reset.
    pub async fn new_chat(&self) {
        self.sessions.reset().await;
        self.attachments.lock().expect("attachments lock").clear();
    }

    // ── Identity ────────────────────────────────────────────────────────

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.username.as_deref()
    }

    /// Clear the persisted identity and all local conversation state. The
    /// caller builds a fresh engine afterwards (guest mode).
    pub async fn logout(&self) -> Result<()> {
        Credentials::clear(self.store.as_ref())?;
        self.new_chat().await;
        Ok(())
    }

    // ── Attachments ─────────────────────────────────────────────────────

    pub fn add_attachment(&self, name: impl Into<String>, bytes: Vec<u8>) -> Result<Uuid> {
        self.attachments.lock().expect("attachments lock").add(name, bytes)
    }

    pub fn remove_attachment(&self, id: Uuid) -> bool {
        self.attachments.lock().expect("attachments lock").remove(id)
    }

    pub fn attachments(&self) -> Vec<UploadedAttachment> {
        self.attachments.lock().expect("attachments lock").items().to_vec()
    }
}
