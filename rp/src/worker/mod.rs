//! Worker - drives one task through its request lifecycle
//!
//! State machine:
//! `Created -> Requesting -> {Succeeded | Failed} -> Completed`
//!
//! A task without a URL goes `Created -> Failed` without touching the
//! transport. Every path ends in `Completed`, and the task's callbacks are
//! consumed on the way there so none can fire twice.

mod decode;

pub use decode::decode_body;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::domain::{
    Callbacks, ErrorInfo, Outcome, RequestInterceptor, Response, ResponseInterceptor, Task, TaskError, TaskId,
};
use crate::transport::{BeginEvent, OutgoingRequest, Progress, Transport, TransportError, TransportObserver};

/// Lifecycle state of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Requesting,
    Succeeded,
    Failed,
    Completed,
}

impl WorkerState {
    fn can_transition_to(self, next: WorkerState) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Requesting)
                | (Self::Created, Self::Failed)
                | (Self::Requesting, Self::Succeeded)
                | (Self::Requesting, Self::Failed)
                | (Self::Succeeded, Self::Completed)
                | (Self::Failed, Self::Completed)
        )
    }
}

/// Summary of a finished worker, handed back to the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReport {
    pub task_id: TaskId,
    pub succeeded: bool,
    pub elapsed: Duration,
}

/// Forwards transport notifications to the task's interceptors
struct InterceptorObserver<'a> {
    task_id: &'a TaskId,
    request_interceptor: Option<&'a RequestInterceptor>,
    response_interceptor: Option<&'a ResponseInterceptor>,
}

impl TransportObserver for InterceptorObserver<'_> {
    fn on_begin(&self, event: &BeginEvent) {
        if let Some(interceptor) = self.request_interceptor {
            interceptor(self.task_id, event);
        }
    }

    fn on_progress(&self, progress: Progress) {
        if let Some(interceptor) = self.response_interceptor {
            if let Some(percent) = progress.percent() {
                interceptor(percent);
            }
        }
    }
}

/// Executes exactly one task end to end
pub struct Worker {
    task: Task,
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
    state: WorkerState,
}

impl Worker {
    pub fn new(task: Task, transport: Arc<dyn Transport>, default_timeout: Duration) -> Self {
        debug!(task_id = %task.id(), "Worker::new: called");
        Self {
            task,
            transport,
            default_timeout,
            state: WorkerState::Created,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn transition(&mut self, next: WorkerState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid worker transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(task_id = %self.task.id(), from = ?self.state, to = ?next, "Worker::transition");
        self.state = next;
    }

    /// Run the task to completion and deliver its outcome to the callbacks
    pub async fn run(mut self) -> WorkerReport {
        let started = Instant::now();
        let callbacks = self.task.request.take_callbacks();

        let outcome = self.request().await;
        let succeeded = outcome.is_success();
        self.transition(if succeeded {
            WorkerState::Succeeded
        } else {
            WorkerState::Failed
        });

        deliver(self.task.id(), outcome, callbacks);
        self.transition(WorkerState::Completed);

        let elapsed = started.elapsed();
        info!(task_id = %self.task.id(), succeeded, elapsed_ms = elapsed.as_millis() as u64, "Worker finished");
        WorkerReport {
            task_id: self.task.id().clone(),
            succeeded,
            elapsed,
        }
    }

    /// Perform the exchange and reduce it to a tagged outcome
    async fn request(&mut self) -> Outcome {
        if self.task.request.url.trim().is_empty() {
            debug!(task_id = %self.task.id(), "Worker::request: missing url, skipping transport");
            return Outcome::Failure(TaskError::missing_url());
        }

        self.transition(WorkerState::Requesting);
        let request = OutgoingRequest::build(&self.task.request, self.default_timeout);
        let response_type = request.response_type;
        let observer = InterceptorObserver {
            task_id: self.task.id(),
            request_interceptor: self.task.request_interceptor.as_ref(),
            response_interceptor: self.task.response_interceptor.as_ref(),
        };

        match self.transport.execute(request, &observer).await {
            Ok(response) if response.is_success() => {
                debug!(status = response.status, "Worker::request: success status");
                match decode_body(response_type, &response) {
                    Ok(body) => Outcome::Success(Response {
                        status: response.status,
                        body,
                    }),
                    Err(err) => Outcome::Failure(err),
                }
            }
            Ok(response) => {
                debug!(status = response.status, "Worker::request: non-success status");
                Outcome::Failure(TaskError::from_status(i32::from(response.status), response.describe()))
            }
            Err(TransportError::Timeout) => {
                debug!("Worker::request: timeout");
                Outcome::Failure(TaskError::Timeout)
            }
            Err(TransportError::Failed { status, reason }) => {
                debug!(status, %reason, "Worker::request: transport failure");
                Outcome::Failure(TaskError::from_status(i32::from(status), reason))
            }
        }
    }
}

/// Hand the outcome to exactly one of success/fail, then always to complete.
///
/// A panic in one callback is contained so `on_complete` still runs.
fn deliver(task_id: &TaskId, outcome: Outcome, callbacks: Callbacks) {
    let Callbacks {
        on_success,
        on_fail,
        on_complete,
    } = callbacks;

    match outcome {
        Outcome::Success(response) => {
            if let Some(f) = on_success {
                guarded(task_id, "on_success", move || f(response));
            }
        }
        Outcome::Failure(err) => {
            if let Some(f) = on_fail {
                let info = ErrorInfo::from(&err);
                guarded(task_id, "on_fail", move || f(info));
            }
        }
    }

    if let Some(f) = on_complete {
        guarded(task_id, "on_complete", f);
    }
}

/// Run a user callback, logging instead of unwinding if it panics
fn guarded(task_id: &TaskId, name: &'static str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(%task_id, callback = name, "deliver: callback panicked");
    }
}
