//! Task failure taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported for failures detected before dispatch
pub const VALIDATION_STATUS: i32 = -1;

/// Why a task ended in the Failed state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Local validation failure; the transport is never touched
    #[error("{0}")]
    Validation(String),

    #[error("Timeout!")]
    Timeout,

    #[error("Not found!")]
    NotFound,

    #[error("Internal Server Error!")]
    Server,

    /// Any other non-2xx status or transport-level failure, carrying the raw event
    #[error("{message}")]
    Transport { status: i32, message: String },
}

impl TaskError {
    pub fn missing_url() -> Self {
        Self::Validation("missing url".to_string())
    }

    /// Map a transport status to its error kind; unmapped statuses keep the raw event
    pub fn from_status(status: i32, raw_event: impl Into<String>) -> Self {
        match status {
            404 => Self::NotFound,
            408 => Self::Timeout,
            500 => Self::Server,
            _ => Self::Transport {
                status,
                message: raw_event.into(),
            },
        }
    }

    pub fn status(&self) -> i32 {
        match self {
            Self::Validation(_) => VALIDATION_STATUS,
            Self::Timeout => 408,
            Self::NotFound => 404,
            Self::Server => 500,
            Self::Transport { status, .. } => *status,
        }
    }
}

/// Error payload handed to a request's fail callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub status: i32,
    pub message: Option<String>,
}

impl From<&TaskError> for ErrorInfo {
    fn from(err: &TaskError) -> Self {
        Self {
            status: err.status(),
            message: Some(err.to_string()),
        }
    }
}

impl From<TaskError> for ErrorInfo {
    fn from(err: TaskError) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} {}", self.status, message),
            None => write!(f, "{}", self.status),
        }
    }
}
