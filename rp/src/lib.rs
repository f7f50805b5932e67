//! reqpool - bounded-concurrency asynchronous request scheduler
//!
//! Callers submit HTTP request descriptions and get a task ID back
//! immediately. Tasks wait in a FIFO queue and are admitted to workers
//! while fewer than `max_concurrency` are in flight. Each worker performs
//! one exchange and reports exactly one terminal outcome through the
//! request's callbacks.
//!
//! # Modules
//!
//! - [`domain`] - Tasks, request descriptions, responses and errors
//! - [`scheduler`] - FIFO queue and admission loop
//! - [`worker`] - Per-task state machine
//! - [`transport`] - Transport trait, request building, reqwest backend
//! - [`config`] - Configuration types and loading
//! - [`manifest`] - YAML request manifests for the CLI
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod manifest;
pub mod scheduler;
pub mod transport;
pub mod worker;

pub use config::{Config, HttpConfig};
pub use domain::{
    ErrorInfo, Method, Outcome, RequestInterceptor, RequestSpec, Response, ResponseBody, ResponseInterceptor,
    ResponseType, Task, TaskError, TaskId,
};
pub use scheduler::{QueueState, Scheduler, SchedulerConfig, SchedulerStats};
pub use transport::{BeginEvent, HttpTransport, Progress, Transport, TransportError};
pub use worker::{Worker, WorkerReport, WorkerState};
