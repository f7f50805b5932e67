//! Domain types for reqpool
//!
//! Tasks, request descriptors, decoded responses and the failure taxonomy
//! shared by the scheduler, workers and transports.

mod error;
mod id;
mod request;
mod response;
mod task;

pub use error::{ErrorInfo, TaskError, VALIDATION_STATUS};
pub use id::TaskId;
pub use request::{
    Callbacks, CompleteCallback, FailCallback, Method, RequestInterceptor, RequestSpec, ResponseInterceptor,
    ResponseType, SuccessCallback,
};
pub use response::{Outcome, Response, ResponseBody};
pub use task::Task;
