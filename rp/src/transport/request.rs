//! Outgoing request construction
//!
//! Turns a [`RequestSpec`] into the concrete method/URL/headers/body a
//! transport sends. Simple methods fold the payload into the query string;
//! everything else sends it as a JSON body.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::domain::{Method, RequestSpec, ResponseType};

/// Content type attached to simple requests that did not set one
pub const SIMPLE_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

/// Content type attached to JSON bodies that did not set one
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Fully resolved request handed to a [`super::Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub response_type: Option<ResponseType>,
    pub timeout: Duration,
}

impl OutgoingRequest {
    /// Resolve a spec, falling back to `default_timeout` when it has no override
    pub fn build(spec: &RequestSpec, default_timeout: Duration) -> Self {
        debug!(method = %spec.method, url = %spec.url, "OutgoingRequest::build: called");
        let mut headers = spec.headers.clone();

        let (url, body) = if spec.method.is_simple() {
            debug!("OutgoingRequest::build: simple method, payload goes to query string");
            set_default_header(&mut headers, "Content-Type", SIMPLE_CONTENT_TYPE);
            (append_query(&spec.url, &query_string(spec.data.as_ref())), None)
        } else {
            debug!("OutgoingRequest::build: payload goes to body");
            let body = spec.data.as_ref().map(Value::to_string);
            if body.is_some() {
                set_default_header(&mut headers, "Content-Type", JSON_CONTENT_TYPE);
            }
            (spec.url.clone(), body)
        };

        Self {
            method: spec.method,
            url,
            headers,
            body,
            response_type: spec.response_type,
            timeout: spec.timeout.unwrap_or(default_timeout),
        }
    }
}

/// Insert a header unless one with the same name (any case) is already present
fn set_default_header(headers: &mut HashMap<String, String>, key: &str, value: &str) {
    if !headers.keys().any(|k| k.eq_ignore_ascii_case(key)) {
        headers.insert(key.to_string(), value.to_string());
    }
}

/// Serialize a payload for the query string.
///
/// Objects become `?k=v&k=v` in key order with both sides percent-encoded,
/// strings are used verbatim, and any other payload contributes nothing.
pub fn query_string(data: Option<&Value>) -> String {
    match data {
        Some(Value::String(raw)) => raw.clone(),
        Some(Value::Object(map)) if !map.is_empty() => {
            let pairs: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(&value_text(value))))
                .collect();
            format!("?{}", pairs.join("&"))
        }
        _ => String::new(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Append a query string, joining with `&` when the URL already has a query
fn append_query(url: &str, query: &str) -> String {
    match query.strip_prefix('?') {
        Some(rest) if url.contains('?') => format!("{}&{}", url, rest),
        _ => format!("{}{}", url, query),
    }
}
