//! Scheduler implementation

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use super::config::SchedulerConfig;
use super::queue::{QueueState, SchedulerStats, TaskQueue};
use crate::domain::{RequestInterceptor, RequestSpec, ResponseInterceptor, Task, TaskId};
use crate::transport::Transport;
use crate::worker::{Worker, WorkerReport};

/// Internal state protected by mutex
struct SchedulerInner {
    /// Pending tasks in submission order
    queue: TaskQueue,

    /// Dispatched tasks whose workers have not completed
    in_flight: usize,

    /// Ceiling on `in_flight`
    max_concurrency: usize,

    /// Whether the admission loop is alive
    running: bool,

    /// Statistics
    stats: SchedulerStats,
}

struct Shared {
    config: SchedulerConfig,
    transport: Arc<dyn Transport>,
    inner: Mutex<SchedulerInner>,
    /// Signalled whenever capacity may have opened up
    slot_freed: Notify,
}

/// What the admission loop decided on one pass
enum Admission {
    Dispatch(Task),
    AtCapacity,
    Drained,
}

/// The Scheduler queues submitted requests and runs them on workers, never
/// keeping more than `max_concurrency` in flight.
///
/// Cloning is cheap; clones share the same queue and counters.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Create a new scheduler with the given configuration and transport
    pub fn new(config: SchedulerConfig, transport: Arc<dyn Transport>) -> Self {
        debug!(?config, "Scheduler::new: called");
        let max_concurrency = config.max_concurrency.max(1);
        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                inner: Mutex::new(SchedulerInner {
                    queue: TaskQueue::new(),
                    in_flight: 0,
                    max_concurrency,
                    running: false,
                    stats: SchedulerStats::default(),
                }),
                slot_freed: Notify::new(),
            }),
        }
    }

    /// Change the concurrency ceiling; `0` is ignored.
    ///
    /// Takes effect on the next admission check. Lowering it never preempts
    /// tasks already in flight.
    pub async fn set_max_concurrency(&self, max_concurrency: usize) {
        debug!(max_concurrency, "Scheduler::set_max_concurrency: called");
        if max_concurrency == 0 {
            debug!("Scheduler::set_max_concurrency: zero, ignoring");
            return;
        }

        let mut inner = self.shared.inner.lock().await;
        inner.max_concurrency = max_concurrency;
        drop(inner);

        self.shared.slot_freed.notify_one();
    }

    /// Queue a request and return its task ID without waiting for it to run
    pub async fn submit(&self, request: RequestSpec) -> TaskId {
        self.submit_with_interceptors(request, None, None).await
    }

    /// Queue a request with begin/progress interceptors attached
    pub async fn submit_with_interceptors(
        &self,
        request: RequestSpec,
        request_interceptor: Option<RequestInterceptor>,
        response_interceptor: Option<ResponseInterceptor>,
    ) -> TaskId {
        let task = Task::new(request, request_interceptor, response_interceptor);
        let task_id = task.id().clone();
        debug!(%task_id, method = %task.request().method, url = %task.request().url, "Scheduler::submit: called");

        let mut inner = self.shared.inner.lock().await;
        inner.queue.enqueue(task);
        inner.stats.total_submitted += 1;
        inner.stats.peak_queue_depth = inner.stats.peak_queue_depth.max(inner.queue.len());

        if !inner.running {
            debug!("Scheduler::submit: admission loop idle, starting it");
            inner.running = true;
            tokio::spawn(admission_loop(Arc::clone(&self.shared)));
        }

        task_id
    }

    /// Get current queue state
    pub async fn queue_state(&self) -> QueueState {
        let inner = self.shared.inner.lock().await;
        QueueState {
            in_flight: inner.in_flight,
            queued: inner.queue.len(),
            max_concurrency: inner.max_concurrency,
            running: inner.running,
            stats: inner.stats.clone(),
        }
    }

    /// Get the scheduler statistics
    pub async fn stats(&self) -> SchedulerStats {
        let inner = self.shared.inner.lock().await;
        inner.stats.clone()
    }
}

/// Pull tasks off the queue while below the ceiling; exit once the queue drains.
async fn admission_loop(shared: Arc<Shared>) {
    debug!("admission_loop: started");
    loop {
        let admission = {
            let mut inner = shared.inner.lock().await;
            if inner.queue.is_empty() {
                inner.running = false;
                Admission::Drained
            } else if inner.in_flight >= inner.max_concurrency {
                Admission::AtCapacity
            } else {
                match inner.queue.dequeue() {
                    Some(task) => {
                        inner.in_flight += 1;
                        inner.stats.total_dispatched += 1;
                        inner.stats.peak_in_flight = inner.stats.peak_in_flight.max(inner.in_flight);
                        Admission::Dispatch(task)
                    }
                    None => {
                        inner.running = false;
                        Admission::Drained
                    }
                }
            }
        };

        match admission {
            Admission::Dispatch(task) => dispatch(&shared, task),
            Admission::AtCapacity => {
                debug!("admission_loop: at capacity, waiting for a slot");
                shared.slot_freed.notified().await;
            }
            Admission::Drained => {
                debug!("admission_loop: queue drained, stopping");
                return;
            }
        }
    }
}

/// Hand a task to a new worker without waiting for it
fn dispatch(shared: &Arc<Shared>, task: Task) {
    let task_id = task.id().clone();
    debug!(%task_id, "dispatch: called");
    let worker = Worker::new(task, Arc::clone(&shared.transport), shared.config.default_timeout());
    let shared = Arc::clone(shared);

    tokio::spawn(async move {
        let report = match AssertUnwindSafe(worker.run()).catch_unwind().await {
            Ok(report) => Some(report),
            Err(_) => {
                warn!(%task_id, "dispatch: worker panicked");
                None
            }
        };
        complete(&shared, &task_id, report.as_ref()).await;
    });
}

/// Release a worker's slot and wake the admission loop
async fn complete(shared: &Shared, task_id: &TaskId, report: Option<&WorkerReport>) {
    let succeeded = report.is_some_and(|r| r.succeeded);
    let elapsed_ms = report.map(|r| r.elapsed.as_millis() as u64);

    let mut inner = shared.inner.lock().await;
    inner.in_flight = inner.in_flight.saturating_sub(1);
    if succeeded {
        inner.stats.total_succeeded += 1;
    } else {
        inner.stats.total_failed += 1;
    }
    info!(
        %task_id,
        succeeded,
        ?elapsed_ms,
        in_flight = inner.in_flight,
        queued = inner.queue.len(),
        "Task completed"
    );
    drop(inner);

    shared.slot_freed.notify_one();
}
