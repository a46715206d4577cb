//! Service ports: collaborator contracts + shared data types.
//!
//! Every collaborator the workbench talks to implements one of these traits in full; the
//! workbench never probes a collaborator for optional capabilities.

pub mod console;
pub mod project;
pub mod settings;
pub mod vcs;
pub mod viewer;

pub use console::{Console, ConsoleLevel, ConsoleStream};
pub use project::{DirEntryInfo, ProjectTree};
pub use settings::{Settings, ToolchainSettings};
pub use vcs::{VcsEntry, VcsError, VcsFileStatus, VcsFileStatusKind, VcsStatus, VersionControl};
pub use viewer::ExternalViewer;
