use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, Notify};

use studymate_core::api::{Backend, ChatRecord, CompletionReply, SessionSummary};
use studymate_core::attachments::UploadedAttachment;
use studymate_core::conversation::{Message, Transcript};
use studymate_core::error::{Result, StudyMateError};
use studymate_core::session::{SessionManager, SessionState};

// ========================================================================
// Backend fake
// ========================================================================

#[derive(Default)]
struct MockBackend {
    create_calls: AtomicUsize,
    append_calls: AtomicUsize,
    fail_create: AtomicBool,
    fail_append: AtomicBool,
    /// When set, create_chat blocks on `create_gate` after signalling
    /// `create_entered`, letting tests hold a create in flight.
    gate_create: AtomicBool,
    create_entered: Notify,
    create_gate: Notify,
    appended: StdMutex<Vec<(String, usize)>>,
    record: StdMutex<Option<ChatRecord>>,
}

impl MockBackend {
    fn gated() -> Self {
        let backend = Self::default();
        backend.gate_create.store(true, Ordering::SeqCst);
        backend
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _messages: &[Message],
        _attachments: &[UploadedAttachment],
    ) -> Result<CompletionReply> {
        Ok(CompletionReply::default())
    }

    async fn list_chats(&self) -> Result<Vec<SessionSummary>> {
        Ok(vec![SessionSummary {
            id: "chat-1".to_string(),
            title: "Algebra notes".to_string(),
            updated_at: None,
        }])
    }

    async fn create_chat(&self, _title: &str, _first_message: &Message) -> Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.gate_create.load(Ordering::SeqCst) {
            self.create_entered.notify_one();
            self.create_gate.notified().await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StudyMateError::Backend("create rejected".to_string()));
        }
        Ok("chat-1".to_string())
    }

    async fn append_messages(&self, chat_id: &str, messages: &[Message]) -> Result<()> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(StudyMateError::Backend("append rejected".to_string()));
        }
        self.appended
            .lock()
            .unwrap()
            .push((chat_id.to_string(), messages.len()));
        Ok(())
    }

    async fn get_chat(&self, chat_id: &str) -> Result<ChatRecord> {
        self.record
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| StudyMateError::Backend(format!("unknown chat {chat_id}")))
    }
}

fn assistant(text: &str) -> Message {
    Message::assistant(studymate_core::content::process(text), Vec::new())
}

fn manager_over(
    backend: Arc<MockBackend>,
    authenticated: bool,
) -> (Arc<SessionManager>, Arc<Mutex<Transcript>>) {
    let transcript = Arc::new(Mutex::new(Transcript::new()));
    let manager = Arc::new(SessionManager::new(
        backend,
        transcript.clone(),
        authenticated,
    ));
    (manager, transcript)
}

// ========================================================================
// Create serialization
// ========================================================================

#[tokio::test]
async fn test_concurrent_ensure_session_sends_exactly_one_create() {
    let backend = Arc::new(MockBackend::gated());
    let (manager, _) = manager_over(backend.clone(), true);

    let user = Message::user("first question");
    let in_flight = tokio::spawn({
        let manager = manager.clone();
        let user = user.clone();
        async move { manager.ensure_session(&user).await }
    });
    backend.create_entered.notified().await;

    // Second call while the first create is still in flight: no-op.
    assert!(manager.ensure_session(&user).await.is_none());
    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), SessionState::Creating);

    backend.create_gate.notify_one();
    let id = in_flight.await.unwrap();
    assert_eq!(id.as_deref(), Some("chat-1"));
    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), SessionState::Active("chat-1".to_string()));
}

#[tokio::test]
async fn test_failed_create_retries_on_next_message() {
    let backend = Arc::new(MockBackend::default());
    backend.fail_create.store(true, Ordering::SeqCst);
    let (manager, _) = manager_over(backend.clone(), true);

    let user = Message::user("first question");
    assert!(manager.ensure_session(&user).await.is_none());
    assert_eq!(manager.state(), SessionState::NoSession);
    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);

    // Next message attempts a fresh create.
    backend.fail_create.store(false, Ordering::SeqCst);
    let id = manager.ensure_session(&user).await;
    assert_eq!(id.as_deref(), Some("chat-1"));
    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_active_session_is_reused_without_creating() {
    let backend = Arc::new(MockBackend::default());
    let (manager, _) = manager_over(backend.clone(), true);

    let user = Message::user("question");
    manager.ensure_session(&user).await;
    manager.ensure_session(&user).await;

    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
}

// ========================================================================
// Guest mode
// ========================================================================

#[tokio::test]
async fn test_guest_persists_nothing_and_lists_empty() {
    let backend = Arc::new(MockBackend::default());
    let (manager, _) = manager_over(backend.clone(), false);

    let user = Message::user("question");
    assert!(manager.ensure_session(&user).await.is_none());
    manager.persist_turn(user.clone(), assistant("an answer")).await;

    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.append_calls.load(Ordering::SeqCst), 0);
    assert!(manager.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_authenticated_listing_returns_summaries() {
    let backend = Arc::new(MockBackend::default());
    let (manager, _) = manager_over(backend, true);

    let sessions = manager.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].title, "Algebra notes");
}

// ========================================================================
// Turn persistence
// ========================================================================

#[tokio::test]
async fn test_persist_turn_creates_then_appends() {
    let backend = Arc::new(MockBackend::default());
    let (manager, _) = manager_over(backend.clone(), true);

    let user = Message::user("what is a limit?");
    manager
        .persist_turn(user, assistant("a value a function approaches"))
        .await;

    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
    let appended = backend.appended.lock().unwrap();
    assert_eq!(appended.as_slice(), &[("chat-1".to_string(), 2)]);
}

#[tokio::test]
async fn test_append_failure_is_swallowed() {
    let backend = Arc::new(MockBackend::default());
    backend.fail_append.store(true, Ordering::SeqCst);
    let (manager, _) = manager_over(backend.clone(), true);

    // Must not error or panic; the transcript remains authoritative.
    manager.persist_turn(Message::user("q"), assistant("a")).await;

    assert_eq!(backend.append_calls.load(Ordering::SeqCst), 1);
    assert!(backend.appended.lock().unwrap().is_empty());
    assert_eq!(manager.state(), SessionState::Active("chat-1".to_string()));
}

// ========================================================================
// Loading a persisted session
// ========================================================================

#[tokio::test]
async fn test_load_chat_replaces_unsaved_local_transcript() {
    let backend = Arc::new(MockBackend::default());

    let mut persisted = Transcript::new();
    persisted.append_user("persisted question").unwrap();
    persisted.append_assistant("persisted answer", &[]);
    *backend.record.lock().unwrap() = Some(ChatRecord {
        id: "chat-9".to_string(),
        title: "older chat".to_string(),
        messages: persisted.messages().to_vec(),
        created_at: None,
        updated_at: None,
    });

    let (manager, transcript) = manager_over(backend, true);
    transcript.lock().await.append_user("unsaved local message");

    let loaded = manager.load_chat("chat-9").await.unwrap();
    assert_eq!(loaded.len(), 2);

    let transcript = transcript.lock().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.messages()[0].content, "persisted question");
    assert_eq!(manager.state(), SessionState::Active("chat-9".to_string()));
}

#[tokio::test]
async fn test_reset_returns_to_no_session() {
    let backend = Arc::new(MockBackend::default());
    let (manager, transcript) = manager_over(backend, true);

    transcript.lock().await.append_user("something");
    manager.ensure_session(&Message::user("q")).await;
    manager.reset().await;

    assert_eq!(manager.state(), SessionState::NoSession);
    assert!(transcript.lock().await.is_empty());
}
