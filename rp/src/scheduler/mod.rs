//! Scheduler for request execution
//!
//! Queues submitted requests in FIFO order and admits them to workers
//! while the number in flight is below a configurable ceiling.

mod config;
mod core;
mod queue;

pub use config::SchedulerConfig;
pub use core::Scheduler;
pub use queue::{QueueState, SchedulerStats, TaskQueue};
