//! Transport collaborator
//!
//! A [`Transport`] performs one HTTP exchange for a worker. While the body
//! streams in it reports to a [`TransportObserver`]: one `begin` when the
//! response head arrives, then zero or more `progress` notifications. The
//! returned `Result` is the single terminal notification.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

mod http;
mod request;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpTransport;
pub use request::{JSON_CONTENT_TYPE, OutgoingRequest, SIMPLE_CONTENT_TYPE, query_string};

/// Response metadata received before the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginEvent {
    pub status: u16,
    pub content_length: Option<u64>,
}

/// Bytes received so far, and the total when the server announced one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    /// `floor(loaded / total * 100)`, or `None` when the total is not computable
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(total) if total > 0 => Some((self.loaded.min(total) * 100 / total) as u8),
            _ => None,
        }
    }
}

/// Full response of a completed exchange (any status)
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Canonical reason phrase for the status, if known
    pub reason: Option<String>,
    pub body: Bytes,
    /// Whether the server announced the body length up front
    pub length_computable: bool,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Description of the exchange used as the message for unmapped statuses
    pub fn describe(&self) -> String {
        match &self.reason {
            Some(reason) => format!("{} {}", self.status, reason),
            None => format!("HTTP {}", self.status),
        }
    }
}

/// Transport-level failure: the exchange never produced a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("transport failure (status {status}): {reason}")]
    Failed { status: u16, reason: String },
}

/// Receives lifecycle notifications while an exchange is in progress
pub trait TransportObserver: Send + Sync {
    fn on_begin(&self, event: &BeginEvent);
    fn on_progress(&self, progress: Progress);
}

/// Observer that ignores every notification
pub struct NoopObserver;

impl TransportObserver for NoopObserver {
    fn on_begin(&self, _event: &BeginEvent) {}
    fn on_progress(&self, _progress: Progress) {}
}

/// Performs a single HTTP exchange
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, reporting begin/progress to `observer`, and return the
    /// terminal result. Timeouts must be reported as [`TransportError::Timeout`].
    async fn execute(
        &self,
        request: OutgoingRequest,
        observer: &dyn TransportObserver,
    ) -> Result<TransportResponse, TransportError>;
}
