// Backend client for the assistant endpoint
// One POST per user message; no retry, no timeout, no backoff.

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CHAT_PATH: &str = "chat";

/// Errors that can occur while talking to the assistant endpoint
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced a response
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body was not the expected JSON
    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    /// The endpoint URL could not be joined with the chat path
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub responses: Option<Vec<String>>,
}

impl ChatResponse {
    pub fn into_replies(self) -> Vec<String> {
        self.responses.unwrap_or_default()
    }
}

/// Something that turns a user message into reply strings
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn ask(&self, text: &str) -> Result<Vec<String>, BackendError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    chat_url: url::Url,
}

impl HttpBackend {
    /// `endpoint` is the base URL; requests go to `<endpoint>/chat`.
    pub fn new(endpoint: &url::Url) -> Result<Self, BackendError> {
        let chat_url = chat_url(endpoint)?;
        Ok(HttpBackend {
            client: reqwest::Client::new(),
            chat_url,
        })
    }

    pub fn chat_url(&self) -> &url::Url {
        &self.chat_url
    }
}

fn chat_url(endpoint: &url::Url) -> Result<url::Url, url::ParseError> {
    // Url::join drops the last path segment unless the base ends with '/'
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(CHAT_PATH)
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn ask(&self, text: &str) -> Result<Vec<String>, BackendError> {
        debug!("POST {} ({} chars)", self.chat_url, text.chars().count());

        let response = self
            .client
            .post(self.chat_url.clone())
            .json(&ChatRequest { message: text })
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // The body is still read: a JSON error body without replies
            // ends up as the "didn't understand" fallback.
            warn!("Backend answered with status {}", status);
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let replies = parse_replies(&body)?;
        debug!("Backend returned {} replies", replies.len());
        Ok(replies)
    }
}

/// Reply strings from a response body. Any JSON value is accepted; one that
/// is not an object has no `responses` and yields no replies.
pub fn parse_replies(body: &str) -> Result<Vec<String>, BackendError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| BackendError::InvalidBody(e.to_string()))?;
    if !value.is_object() {
        return Ok(Vec::new());
    }
    let parsed: ChatResponse =
        serde_json::from_value(value).map_err(|e| BackendError::InvalidBody(e.to_string()))?;
    Ok(parsed.into_replies())
}
