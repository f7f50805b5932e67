//! Scripted in-process transport for scheduler and worker tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{BeginEvent, OutgoingRequest, Progress, Transport, TransportError, TransportObserver, TransportResponse};

/// What the stub answers for a URL
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Respond {
        status: u16,
        body: Bytes,
        length_computable: bool,
    },
    Fail(TransportError),
}

impl Scripted {
    pub(crate) fn status(status: u16, body: &'static str) -> Self {
        Self::Respond {
            status,
            body: Bytes::from_static(body.as_bytes()),
            length_computable: true,
        }
    }

    pub(crate) fn streamed(status: u16, body: &'static str) -> Self {
        Self::Respond {
            status,
            body: Bytes::from_static(body.as_bytes()),
            length_computable: false,
        }
    }
}

pub(crate) struct StubTransport {
    fallback: Scripted,
    routes: HashMap<String, Scripted>,
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<OutgoingRequest>>,
}

impl StubTransport {
    pub(crate) fn new(fallback: Scripted) -> Self {
        Self {
            fallback,
            routes: HashMap::new(),
            delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn ok(body: &'static str) -> Self {
        Self::new(Scripted::status(200, body))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn route(mut self, url: &str, scripted: Scripted) -> Self {
        self.routes.insert(url.to_string(), scripted);
        self
    }

    /// Highest number of exchanges that were in progress at once
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<OutgoingRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(
        &self,
        request: OutgoingRequest,
        observer: &dyn TransportObserver,
    ) -> Result<TransportResponse, TransportError> {
        let scripted = self.routes.get(&request.url).unwrap_or(&self.fallback).clone();
        self.calls.lock().unwrap().push(request);

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        match scripted {
            Scripted::Fail(err) => Err(err),
            Scripted::Respond {
                status,
                body,
                length_computable,
            } => {
                let total = length_computable.then_some(body.len() as u64);
                observer.on_begin(&BeginEvent {
                    status,
                    content_length: total,
                });
                let half = body.len() / 2;
                if half > 0 {
                    observer.on_progress(Progress {
                        loaded: half as u64,
                        total,
                    });
                }
                observer.on_progress(Progress {
                    loaded: body.len() as u64,
                    total,
                });
                Ok(TransportResponse {
                    status,
                    reason: None,
                    body,
                    length_computable,
                })
            }
        }
    }
}
