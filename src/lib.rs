//! forgebench - interactive code workbench engine
//!
//! Module layout:
//! - kernel: headless state (languages, documents, highlighting, execution, assistant payloads)
//! - kernel::services: collaborator ports and their OS/runtime adapters
//! - app: the coordinating workbench and console surfaces
//! - logging: tracing setup shared by the binaries

pub mod app;
pub mod kernel;
pub mod logging;
