//! Application layer: the coordinating workbench and its console surfaces.

pub mod command;
pub mod console;
pub mod workbench;

pub use command::{dispatch, Command, Outcome};
pub use console::{LineBuffer, RecordingConsole, StdoutConsole};
pub use workbench::{Workbench, WorkbenchServices};
