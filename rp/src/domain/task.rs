//! Task - one queued unit of work

use std::time::Duration;

use super::id::TaskId;
use super::request::{RequestInterceptor, RequestSpec, ResponseInterceptor};

/// A request descriptor plus the identity and interceptors assigned at submit time.
///
/// Once enqueued a task is only ever moved: out of the queue into exactly one
/// worker, which drops it when done.
pub struct Task {
    id: TaskId,
    /// Always 0; tasks are never retried
    retry_count: u32,
    /// Always zero; tasks are never retried
    retry_delay: Duration,
    pub(crate) request: RequestSpec,
    pub(crate) request_interceptor: Option<RequestInterceptor>,
    pub(crate) response_interceptor: Option<ResponseInterceptor>,
}

impl Task {
    /// Create a task with a freshly generated ID
    pub fn new(
        request: RequestSpec,
        request_interceptor: Option<RequestInterceptor>,
        response_interceptor: Option<ResponseInterceptor>,
    ) -> Self {
        Self {
            id: TaskId::generate(),
            retry_count: 0,
            retry_delay: Duration::ZERO,
            request,
            request_interceptor,
            response_interceptor,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn request(&self) -> &RequestSpec {
        &self.request
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("retry_count", &self.retry_count)
            .field("retry_delay", &self.retry_delay)
            .field("request", &self.request)
            .field("request_interceptor", &self.request_interceptor.is_some())
            .field("response_interceptor", &self.response_interceptor.is_some())
            .finish()
    }
}
