//! Request descriptors
//!
//! A [`RequestSpec`] declares intent for one network call plus the callbacks
//! that observe its terminal outcome.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ErrorInfo;
use super::id::TaskId;
use super::response::Response;
use crate::transport::BeginEvent;

/// Invoked once with the decoded response of a 2xx exchange
pub type SuccessCallback = Box<dyn FnOnce(Response) + Send>;

/// Invoked once with the mapped error of a failed exchange
pub type FailCallback = Box<dyn FnOnce(ErrorInfo) + Send>;

/// Invoked once after either terminal outcome
pub type CompleteCallback = Box<dyn FnOnce() + Send>;

/// Side-channel notification when the response head arrives
pub type RequestInterceptor = Box<dyn Fn(&TaskId, &BeginEvent) + Send + Sync>;

/// Receives the download percentage while the body streams in
pub type ResponseInterceptor = Box<dyn Fn(u8) + Send + Sync>;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// GET and DELETE carry their payload in the query string, never in a body
    pub fn is_simple(self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(format!("Unknown method: {}", s)),
        }
    }
}

/// How a successful response body should be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Json,
    Document,
    Blob,
}

impl std::str::FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "document" => Ok(Self::Document),
            "blob" => Ok(Self::Blob),
            _ => Err(format!("Unknown response type: {}. Use: text, json, document, or blob", s)),
        }
    }
}

/// Terminal-outcome callbacks attached to a request
#[derive(Default)]
pub struct Callbacks {
    pub on_success: Option<SuccessCallback>,
    pub on_fail: Option<FailCallback>,
    pub on_complete: Option<CompleteCallback>,
}

/// Declares one network call
#[derive(Default)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    /// Payload: query string for simple methods, JSON body otherwise
    pub data: Option<serde_json::Value>,
    pub headers: HashMap<String, String>,
    pub response_type: Option<ResponseType>,
    /// Overrides the scheduler's default timeout
    pub timeout: Option<Duration>,
    pub(crate) callbacks: Callbacks,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set a header; a later value for the same name (any case) replaces the earlier one
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        self.headers.insert(key, value.into());
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(Response) + Send + 'static) -> Self {
        self.callbacks.on_success = Some(Box::new(f));
        self
    }

    pub fn on_fail(mut self, f: impl FnOnce(ErrorInfo) + Send + 'static) -> Self {
        self.callbacks.on_fail = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.callbacks.on_complete = Some(Box::new(f));
        self
    }

    /// Detach the callbacks so they can be consumed by the terminal step
    pub(crate) fn take_callbacks(&mut self) -> Callbacks {
        std::mem::take(&mut self.callbacks)
    }
}

impl std::fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("response_type", &self.response_type)
            .field("timeout", &self.timeout)
            .field("on_success", &self.callbacks.on_success.is_some())
            .field("on_fail", &self.callbacks.on_fail.is_some())
            .field("on_complete", &self.callbacks.on_complete.is_some())
            .finish()
    }
}
