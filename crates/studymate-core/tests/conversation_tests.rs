use studymate_core::conversation::{Role, Transcript};

// ========================================================================
// Appending
// ========================================================================

#[test]
fn test_append_user_rejects_blank_input() {
    let mut transcript = Transcript::new();

    assert!(transcript.append_user("").is_none());
    assert!(transcript.append_user("   \n\t").is_none());
    assert!(transcript.is_empty());
}

#[test]
fn test_append_user_assigns_unique_ids_in_order() {
    let mut transcript = Transcript::new();

    let first = transcript.append_user("first question").unwrap();
    let second = transcript.append_user("second question").unwrap();

    assert_ne!(first, second);
    let messages = transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, first);
    assert_eq!(messages[1].id, second);
    assert_eq!(messages[0].content, "first question");
}

#[test]
fn test_append_assistant_merges_backend_sources_first() {
    let mut transcript = Transcript::new();

    let extra = vec!["backend.pdf".to_string(), "shared.pdf".to_string()];
    let message = transcript.append_assistant(
        "# SOURCE: shared.pdf\nSee [source: inline.pdf] here",
        &extra,
    );

    assert_eq!(
        message.sources,
        vec!["backend.pdf", "shared.pdf", "inline.pdf"]
    );
    assert_eq!(message.role, Role::Assistant);
}

#[test]
fn test_append_error_keeps_user_message_intact() {
    let mut transcript = Transcript::new();

    transcript.append_user("what is entropy?").unwrap();
    transcript.append_error("connection refused");

    let messages = transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "what is entropy?");
    assert!(!messages[0].is_error);
    assert!(messages[1].is_error);
    assert_eq!(
        messages[1].content,
        "Sorry, I encountered an error: connection refused"
    );
}

// ========================================================================
// Pending placeholder
// ========================================================================

#[test]
fn test_only_one_pending_placeholder_at_a_time() {
    let mut transcript = Transcript::new();

    transcript.begin_pending().unwrap();
    assert!(transcript.has_pending());
    assert!(transcript.begin_pending().is_err());
}

#[test]
fn test_resolve_pending_replaces_the_placeholder_slot() {
    let mut transcript = Transcript::new();

    transcript.append_user("question").unwrap();
    let placeholder_id = transcript.begin_pending().unwrap();
    assert_eq!(transcript.len(), 2);

    let resolved = transcript.resolve_pending("the answer", &[]).unwrap();

    // Same slot, new message value: replaced, not mutated in place.
    let messages = transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].id, resolved.id);
    assert_ne!(messages[1].id, placeholder_id);
    assert_eq!(messages[1].content, "the answer");
    assert!(!messages[1].pending);
    assert!(!transcript.has_pending());
}

#[test]
fn test_fail_pending_yields_paired_error_message() {
    let mut transcript = Transcript::new();

    transcript.append_user("question").unwrap();
    transcript.begin_pending().unwrap();
    let failed = transcript.fail_pending("HTTP 503").unwrap();

    let messages = transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "question");
    assert!(failed.is_error);
    assert!(messages[1].content.contains("HTTP 503"));
    assert!(!transcript.has_pending());
}

#[test]
fn test_resolve_without_pending_is_an_error() {
    let mut transcript = Transcript::new();
    assert!(transcript.resolve_pending("text", &[]).is_err());
    assert!(transcript.fail_pending("reason").is_err());
}

#[test]
fn test_completed_messages_exclude_the_placeholder() {
    let mut transcript = Transcript::new();

    transcript.append_user("question").unwrap();
    transcript.begin_pending().unwrap();

    let wire = transcript.completed_messages();
    assert_eq!(wire.len(), 1);
    assert_eq!(wire[0].content, "question");
}

// ========================================================================
// Wholesale replacement
// ========================================================================

#[test]
fn test_replace_all_discards_local_messages() {
    let mut transcript = Transcript::new();
    transcript.append_user("unsaved local message").unwrap();
    transcript.begin_pending().unwrap();

    let mut fetched = Transcript::new();
    fetched.append_user("persisted question").unwrap();
    fetched.append_assistant("persisted answer", &[]);
    let fetched_messages = fetched.messages().to_vec();

    transcript.replace_all(fetched_messages);

    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.messages()[0].content, "persisted question");
    assert!(!transcript.has_pending());
}
