use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::attachments::UploadedAttachment;
use crate::config::Settings;
use crate::conversation::Message;
use crate::error::{Result, StudyMateError};

use super::types::{ChatRecord, CompletionReply, SessionSummary};

/// The narrow backend contract. The session manager and engine only see this
/// trait, so tests can substitute an in-process fake.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Submit the full transcript plus attachments, receive reply text and
    /// backend-asserted sources. Works with or without a bearer token.
    async fn complete(
        &self,
        messages: &[Message],
        attachments: &[UploadedAttachment],
    ) -> Result<CompletionReply>;

    /// Session summaries for the authenticated identity.
    async fn list_chats(&self) -> Result<Vec<SessionSummary>>;

    /// Persist the first turn; returns the server-assigned session id.
    async fn create_chat(&self, title: &str, first_message: &Message) -> Result<String>;

    /// Persist subsequent turn(s) to an existing session.
    async fn append_messages(&self, chat_id: &str, messages: &[Message]) -> Result<()>;

    /// Full message list for a session.
    async fn get_chat(&self, chat_id: &str) -> Result<ChatRecord>;
}

/// Backend over HTTP, speaking the StudyMate REST surface.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.backend.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: settings.backend.base_url.clone(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a non-success response to a backend error carrying a short
    /// snippet, preferring the backend's own `details`/`error` fields.
    async fn error_from(response: reqwest::Response) -> StudyMateError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("details")
                    .or_else(|| v.get("error"))
                    .and_then(|d| d.as_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or(body);
        let snippet: String = detail.chars().take(200).collect();
        if snippet.trim().is_empty() {
            StudyMateError::Backend(format!("HTTP {status}"))
        } else {
            StudyMateError::Backend(snippet)
        }
    }
}

#[derive(Deserialize)]
struct ListChatsResponse {
    #[serde(default)]
    chats: Vec<SessionSummary>,
}

#[derive(Deserialize)]
struct CreateChatResponse {
    #[serde(rename = "chatId")]
    chat_id: String,
}

#[derive(Deserialize)]
struct GetChatResponse {
    chat: ChatRecord,
}

#[async_trait]
impl Backend for HttpBackend {
    async fn complete(
        &self,
        messages: &[Message],
        attachments: &[UploadedAttachment],
    ) -> Result<CompletionReply> {
        let url = format!("{}/api/chat", self.base_url);
        let payload = serde_json::to_string(messages)?;

        let mut form = multipart::Form::new().text("messages", payload);
        for attachment in attachments {
            // Both keys, for backward compatibility with the earlier backend.
            for key in ["files", "pdfs"] {
                let part = multipart::Part::bytes(attachment.bytes.clone())
                    .file_name(attachment.name.clone());
                form = form.part(key, part);
            }
        }

        let response = self.auth(self.client.post(&url)).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.json::<CompletionReply>().await?)
    }

    async fn list_chats(&self) -> Result<Vec<SessionSummary>> {
        let url = format!("{}/api/history/chats", self.base_url);
        let response = self.auth(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.json::<ListChatsResponse>().await?.chats)
    }

    async fn create_chat(&self, title: &str, first_message: &Message) -> Result<String> {
        let url = format!("{}/api/history/chats", self.base_url);
        let body = serde_json::json!({
            "title": title,
            "firstMessage": first_message,
        });
        let response = self.auth(self.client.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.json::<CreateChatResponse>().await?.chat_id)
    }

    async fn append_messages(&self, chat_id: &str, messages: &[Message]) -> Result<()> {
        let url = format!("{}/api/history/chats/{}/messages", self.base_url, chat_id);
        let body = serde_json::json!({ "messages": messages });
        let response = self.auth(self.client.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }

    async fn get_chat(&self, chat_id: &str) -> Result<ChatRecord> {
        let url = format!("{}/api/history/chats/{}", self.base_url, chat_id);
        let response = self.auth(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.json::<GetChatResponse>().await?.chat)
    }
}
