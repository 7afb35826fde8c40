use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::state::ChatPayload;

/// The single "request failed" class; its `Display` is what follows
/// `Error: ` in the chat pane.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Connection, DNS, TLS or timeout failures
    #[error("{0}")]
    Transport(String),

    #[error("Request failed with status code {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChatError::Decode(err.to_string())
        } else {
            ChatError::Transport(err.to_string())
        }
    }
}

/// Anything that can answer a chat submission
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, payload: &ChatPayload) -> Result<Value, ChatError>;
}

/// HTTP client for the assistant service
#[derive(Clone, Debug)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client whose requests give up after `timeout`
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ChatError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET <base>/health`
    pub async fn health(&self) -> Result<Value, ChatError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ChatError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                detail: error_detail(&text),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ChatError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn chat(&self, payload: &ChatPayload) -> Result<Value, ChatError> {
        let url = format!("{}/chat", self.base_url);
        debug!(%url, turns = payload.conversation.len(), "sending chat request");

        let response = self.client.post(&url).json(payload).send().await;
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "chat request failed");
                return Err(e.into());
            }
        };

        Self::read_json(response).await
    }
}

/// Pull a readable message out of an error body.
///
/// FastAPI reports `{"detail": "..."}`; other bodies are used as-is when
/// short and non-empty.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return match value.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(value.to_string()),
        };
    }

    Some(body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = ChatError::Status {
            status: 500,
            detail: None,
        };
        assert_eq!(err.to_string(), "Request failed with status code 500");

        let err = ChatError::Status {
            status: 500,
            detail: Some("OPENAI_API_KEY missing".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Request failed with status code 500: OPENAI_API_KEY missing"
        );
    }

    #[test]
    fn test_transport_error_is_bare() {
        assert_eq!(ChatError::Transport("timeout".to_string()).to_string(), "timeout");
    }

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(error_detail(""), None);
        assert_eq!(
            error_detail(r#"{"detail": "boom"}"#),
            Some("boom".to_string())
        );
        assert_eq!(
            error_detail(r#"{"detail": [{"msg": "field required"}]}"#),
            Some(r#"[{"msg":"field required"}]"#.to_string())
        );
        assert_eq!(
            error_detail("Bad Gateway"),
            Some("Bad Gateway".to_string())
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ChatClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
