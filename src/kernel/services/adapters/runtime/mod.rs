//! Async runtime adapter: runs processes and blocking collaborator calls, reporting back to
//! the coordinating loop through `AppMessage`s.

mod async_runtime;
mod message;

pub use async_runtime::AsyncRuntime;
pub use message::{AppMessage, VcsOp};
