//! Headless workbench core: documents, highlighting, execution state, assistant payloads.

pub mod assistant;
pub mod document;
pub mod error;
pub mod execution;
pub mod highlight;
pub mod language;
pub mod services;
pub mod theme;

pub use document::{Document, DocumentId};
pub use error::{Result, WorkbenchError};
pub use execution::{ExecutionPhase, Orchestrator, ProcessId};
pub use highlight::{HighlightKind, HighlightSpan, Highlighter, LineHighlight, LineState};
pub use language::{ExecutionKind, LanguageId};
pub use theme::{Rgb, Style, Theme};
