//! Request, response and transport error types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chat message sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }
}

/// Per-call generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    /// `None` uses the configured default model.
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 4000,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}

impl CallOptions {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Fully resolved request handed to a backend.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl CompletionRequest {
    /// Total prompt characters, for logging in place of the prompt itself.
    pub fn prompt_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content.chars().count()).sum()
    }

    pub fn last_user_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Where a completion's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionSource {
    Live,
    Mock,
}

/// Canonical call result: plain text plus provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub source: CompletionSource,
}

impl Completion {
    pub fn is_live(&self) -> bool {
        self.source == CompletionSource::Live
    }
}

/// One item of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: Option<u64> },
    Error(TransportError),
}

/// Transport-level failure talking to the endpoint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication rejected (status {0})")]
    Auth(u16),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("{0}")]
    Unknown(String),
}

impl TransportError {
    /// Diagnostic category used in logs.
    pub fn category(&self) -> &'static str {
        match self {
            TransportError::Timeout => "timeout",
            TransportError::Connection(_) => "connection",
            TransportError::Auth(_) => "auth",
            TransportError::Api { .. } => "api",
            TransportError::Decode(_) => "decode",
            TransportError::Unknown(_) => "unknown",
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => TransportError::Auth(status),
            _ => TransportError::Api { status, body },
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::from_status(status.as_u16(), e.to_string())
        } else if e.is_decode() || e.is_body() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Unknown(e.to_string())
        }
    }
}

impl From<TransportError> for notewise_core::Error {
    fn from(e: TransportError) -> Self {
        notewise_core::Error::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(TransportError::from_status(401, String::new()).category(), "auth");
        assert_eq!(TransportError::from_status(403, String::new()).category(), "auth");
        assert_eq!(
            TransportError::from_status(500, "boom".into()),
            TransportError::Api {
                status: 500,
                body: "boom".into()
            }
        );
    }

    #[test]
    fn test_prompt_chars_counts_all_messages() {
        let req = CompletionRequest {
            messages: vec![ChatMessage::system("ab"), ChatMessage::user("cdé")],
            model: "m".into(),
            max_tokens: 10,
            temperature: 0.0,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(req.prompt_chars(), 5);
        assert_eq!(req.last_user_content(), "cdé");
    }
}
