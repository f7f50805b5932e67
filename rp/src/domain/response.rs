//! Decoded responses and terminal outcomes

use bytes::Bytes;

use super::error::TaskError;

/// Response body decoded according to the declared response type
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Text(String),
    Json(serde_json::Value),
    /// Markup kept as text; no DOM is built
    Document(String),
    Blob(Bytes),
    /// Undecoded payload
    Raw(Bytes),
}

impl ResponseBody {
    /// Best-effort text view of the body
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) | Self::Document(s) => s.clone(),
            Self::Json(v) => v.to_string(),
            Self::Blob(b) | Self::Raw(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) | Self::Document(s) => s.len(),
            Self::Json(v) => v.to_string().len(),
            Self::Blob(b) | Self::Raw(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A successful (2xx) response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: ResponseBody,
}

/// Tagged result produced by a worker's terminal step
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Response),
    Failure(TaskError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
