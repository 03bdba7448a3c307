use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use studymate_core::attachments::pretty_bytes;
use studymate_core::auth::{
    CredentialStore, FileCredentialStore, GUEST_KEY, TOKEN_KEY, USERNAME_KEY,
};
use studymate_core::render::{DiagramRenderer, RenderTarget};
use studymate_core::{ChatEngine, Message, Role, Settings};

// ── Diagram output ──────────────────────────────────────────────────────

/// Terminal stand-in for the diagram service: prints the diagram source
/// under its target id.
struct StdoutRenderer;

impl DiagramRenderer for StdoutRenderer {
    fn render(&self, target: &RenderTarget, source: &str) {
        println!("\n[{}]\n{}", target.element_id(), source);
    }
}

fn build_engine(settings: &Settings, store: Arc<FileCredentialStore>) -> ChatEngine {
    ChatEngine::from_settings(settings, store).with_renderer(Arc::new(StdoutRenderer))
}

// ── Single-prompt mode ──────────────────────────────────────────────────

pub async fn run_single_prompt(
    settings: &Settings,
    prompt: &str,
    attach: &[PathBuf],
) -> Result<()> {
    let store = Arc::new(FileCredentialStore::open());
    let engine = build_engine(settings, store);
    stage_attachments(&engine, attach).await;

    match engine.send(prompt).await? {
        Some(reply) => print_reply(&reply),
        None => eprintln!("Nothing to send."),
    }
    Ok(())
}

// ── Interactive REPL ────────────────────────────────────────────────────

enum CommandResult {
    Continue,
    Quit,
}

pub async fn run_repl(settings: Settings, attach: &[PathBuf]) -> Result<()> {
    let store = Arc::new(FileCredentialStore::open());
    let mut engine = build_engine(&settings, store.clone());
    stage_attachments(&engine, attach).await;

    greet(&engine);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt_marker();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match run_command(command, &settings, &store, &mut engine).await {
                Ok(CommandResult::Continue) => {}
                Ok(CommandResult::Quit) => break,
                Err(e) => eprintln!("error: {e}"),
            }
        } else {
            match engine.send(&line).await {
                Ok(Some(reply)) => print_reply(&reply),
                Ok(None) => {}
                Err(e) => eprintln!("error: {e}"),
            }
        }
    }

    Ok(())
}

async fn run_command(
    command: &str,
    settings: &Settings,
    store: &Arc<FileCredentialStore>,
    engine: &mut ChatEngine,
) -> Result<CommandResult> {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();

    match name {
        "help" => print_help(),
        "chats" => {
            let sessions = engine.list_chats().await?;
            if sessions.is_empty() {
                println!("No saved chats.");
            }
            for session in sessions {
                let updated = session
                    .updated_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                println!("{}  {}  {}", session.id, session.title, updated);
            }
        }
        "load" => {
            let Some(id) = parts.next() else {
                eprintln!("usage: /load <chat-id>");
                return Ok(CommandResult::Continue);
            };
            let messages = engine.load_chat(id).await?;
            print_transcript(&messages);
        }
        "new" => {
            engine.new_chat().await;
            println!("Started a new chat.");
        }
        "attach" => {
            let Some(path) = parts.next() else {
                eprintln!("usage: /attach <file>");
                return Ok(CommandResult::Continue);
            };
            attach_file(engine, Path::new(path)).await;
        }
        "files" => {
            let attachments = engine.attachments();
            if attachments.is_empty() {
                println!("No files added yet.");
            }
            for attachment in attachments {
                println!(
                    "{}  {}  {}",
                    attachment.id,
                    attachment.name,
                    pretty_bytes(attachment.size)
                );
            }
        }
        "detach" => {
            let removed = parts
                .next()
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .map(|id| engine.remove_attachment(id))
                .unwrap_or(false);
            if !removed {
                eprintln!("usage: /detach <attachment-id>");
            }
        }
        "login" => {
            let (Some(username), Some(token)) = (parts.next(), parts.next()) else {
                eprintln!("usage: /login <username> <token>");
                return Ok(CommandResult::Continue);
            };
            store.set(USERNAME_KEY, username)?;
            store.set(TOKEN_KEY, token)?;
            store.remove(GUEST_KEY)?;
            *engine = build_engine(settings, store.clone());
            println!("Signed in as {username}.");
        }
        "guest" => {
            store.remove(TOKEN_KEY)?;
            store.remove(USERNAME_KEY)?;
            store.set(GUEST_KEY, "1")?;
            *engine = build_engine(settings, store.clone());
            println!("Continuing as guest; chats will not be saved.");
        }
        "logout" => {
            engine.logout().await?;
            *engine = build_engine(settings, store.clone());
            println!("Signed out.");
        }
        "quit" | "exit" => return Ok(CommandResult::Quit),
        other => eprintln!("Unknown command /{other}; try /help."),
    }

    Ok(CommandResult::Continue)
}

// ── Helpers ─────────────────────────────────────────────────────────────

async fn stage_attachments(engine: &ChatEngine, paths: &[PathBuf]) {
    for path in paths {
        attach_file(engine, path).await;
    }
}

async fn attach_file(engine: &ChatEngine, path: &Path) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let size = bytes.len() as u64;
            match engine.add_attachment(name.clone(), bytes) {
                Ok(_) => println!("Attached {} ({})", name, pretty_bytes(size)),
                Err(e) => eprintln!("error: {e}"),
            }
        }
        Err(e) => eprintln!("error: could not read {}: {e}", path.display()),
    }
}

fn greet(engine: &ChatEngine) {
    match engine.username() {
        Some(username) => println!("Welcome back, {username}."),
        None => println!("Welcome to StudyMate. /login to save your chats, /help for commands."),
    }
}

fn print_reply(message: &Message) {
    if message.is_error {
        eprintln!("{}", message.content);
        return;
    }
    println!("{}", message.content);
    if !message.sources.is_empty() {
        println!("\nSources:");
        for source in &message.sources {
            println!("  - {source}");
        }
    }
}

fn print_transcript(messages: &[Message]) {
    for message in messages {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => "studymate",
        };
        println!("{speaker}: {}", message.content);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /chats                 list saved chats");
    println!("  /load <chat-id>        open a saved chat (replaces the current one)");
    println!("  /new                   start a fresh chat");
    println!("  /attach <file>         add a document to the conversation");
    println!("  /files                 list attached documents");
    println!("  /detach <id>           remove an attached document");
    println!("  /login <user> <token>  sign in with an API token");
    println!("  /guest                 continue without saving chats");
    println!("  /logout                sign out and clear local state");
    println!("  /quit                  leave");
}

fn prompt_marker() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}
