//! HTTP transport backed by reqwest

use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, warn};

use super::{BeginEvent, OutgoingRequest, Progress, Transport, TransportError, TransportObserver, TransportResponse};
use crate::config::HttpConfig;
use crate::domain::Method;

/// Upper bound on the buffer reserved up front from a Content-Length
const MAX_PREALLOCATE: u64 = 8 * 1024 * 1024;

/// Transport that performs real HTTP exchanges with a shared connection pool
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Build a client from configuration
    pub fn from_config(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        debug!(?config, "HttpTransport::from_config: called");
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(config.pool_idle_timeout())
            .build()?;
        Ok(Self { http })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        debug!(error = %err, "map_error: timeout");
        return TransportError::Timeout;
    }
    TransportError::Failed {
        status: err.status().map(|s| s.as_u16()).unwrap_or(0),
        reason: err.to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: OutgoingRequest,
        observer: &dyn TransportObserver,
    ) -> Result<TransportResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, timeout = ?request.timeout, "HttpTransport::execute: called");
        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), &request.url)
            .timeout(request.timeout);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(url = %request.url, error = %e, "HttpTransport::execute: send failed");
            map_error(e)
        })?;

        let status = response.status();
        let total = response.content_length();
        debug!(status = status.as_u16(), ?total, "HttpTransport::execute: response head received");
        observer.on_begin(&BeginEvent {
            status: status.as_u16(),
            content_length: total,
        });

        let mut buf = BytesMut::with_capacity(total.unwrap_or(0).min(MAX_PREALLOCATE) as usize);
        let mut loaded = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                warn!(url = %request.url, error = %e, "HttpTransport::execute: body read failed");
                map_error(e)
            })?;
            loaded += chunk.len() as u64;
            buf.extend_from_slice(&chunk);
            observer.on_progress(Progress { loaded, total });
        }

        debug!(status = status.as_u16(), loaded, "HttpTransport::execute: body complete");
        Ok(TransportResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body: buf.freeze(),
            length_computable: total.is_some(),
        })
    }
}
