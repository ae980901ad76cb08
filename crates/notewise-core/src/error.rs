//! Error types for Notewise.

use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Generic text shown to users for failures whose detail must stay in the logs.
pub const SYSTEM_BUSY_MESSAGE: &str = "System busy, please retry later";

#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied empty content, zero requested items or a malformed record stream.
    #[error("Invalid input: {0}")]
    Input(String),

    /// Generation endpoint unreachable, timed out or rejected the request.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// A run finished but produced nothing usable.
    #[error("{0}")]
    Business(String),

    #[error("System error: {0}")]
    System(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A generation job is already running for {0}")]
    Busy(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable code for the web layer.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Input(_) => "VALIDATION_ERROR",
            Error::Transport(_) => "API_ERROR",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Business(_) => "BUSINESS_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Busy(_) => "JOB_IN_PROGRESS",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Cancelled => "CANCELLED",
            Error::System(_) | Error::Io(_) | Error::Json(_) => "SYSTEM_ERROR",
        }
    }

    /// Short message safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Error::System(_) | Error::Io(_) | Error::Json(_) => SYSTEM_BUSY_MESSAGE.to_string(),
            Error::Transport(_) => "Generation service temporarily unavailable, please retry later".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Response envelope handed to the web layer: a success flag plus either the
/// artifact or a short human-readable message.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "errorCode")]
    pub error_code: Option<&'static str>,
}

impl<T: Serialize> Outcome<T> {
    pub fn ok(data: T, message: impl Into<Option<String>>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            error_code: None,
        }
    }

    /// Build a failure envelope. System-class detail is logged here and
    /// replaced by a generic message.
    pub fn failed(err: &Error) -> Self {
        if matches!(err, Error::System(_) | Error::Io(_) | Error::Json(_)) {
            error!("System failure: {}", err);
        }
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(err.user_message()),
            error_code: Some(err.code()),
        }
    }

    pub fn from_result(result: Result<T>, message: impl Into<Option<String>>) -> Self {
        match result {
            Ok(data) => Self::ok(data, message),
            Err(e) => Self::failed(&e),
        }
    }
}
