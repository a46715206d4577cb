//! Payloads and heuristics of the assistant exchange.
//!
//! The file transport lives in `services::adapters::ipc`; everything here is pure.

use crate::kernel::document::Document;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Replies the assistant uses to say it has nothing useful to offer.
pub const ERROR_SENTINELS: &[&str] = &["# AI Error", "# Gemini not configured"];

pub const DEFAULT_REFACTOR_REQUEST: &str =
    "Make this code more idiomatic and optimize the main loop.";
pub const TEST_GEN_REQUEST: &str = "Generate comprehensive unit tests for all functions.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub file_path: PathBuf,
    pub context: String,
    pub request_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Refactor,
    TestGen,
}

impl AgentKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Refactor => "refactor",
            Self::TestGen => "test generation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub file_path: PathBuf,
    pub request: String,
    pub request_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "default_agent_message")]
    pub message: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

fn default_agent_message() -> String {
    "No message provided.".to_string()
}

impl AgentResponse {
    /// Responses without an id are accepted; ones naming another request are stale.
    pub fn answers(&self, outstanding: Option<u64>) -> bool {
        match (self.request_id, outstanding) {
            (None, _) => true,
            (Some(id), Some(expected)) => id == expected,
            (Some(_), None) => false,
        }
    }
}

/// Whether the text of the cursor line is worth asking about.
pub fn line_wants_completion(line: &str) -> bool {
    let Some(last) = line.chars().last() else {
        return false;
    };
    last.is_whitespace()
        || matches!(last, '.' | '(' | '=' | ':' | '[')
        || line.trim().chars().count() > 3
}

/// Builds a completion request when the cursor sits at the end of a line that warrants one.
pub fn completion_request(
    doc: &Document,
    context_lines: usize,
    request_id: u64,
) -> Option<CompletionRequest> {
    let path = doc.path()?;
    if !doc.cursor_at_line_end() || !line_wants_completion(&doc.current_line()) {
        return None;
    }
    Some(CompletionRequest {
        file_path: path.to_path_buf(),
        context: doc.completion_context(context_lines),
        request_id,
    })
}

/// First line of a raw completion response, or `None` for blanks and error sentinels.
pub fn suggestion_from_response(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || ERROR_SENTINELS.contains(&trimmed) {
        return None;
    }
    let first = trimmed.lines().next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

/// Whether a suggestion may still be shown in `doc`.
pub fn suggestion_applies(doc: &Document) -> bool {
    doc.cursor_at_line_end() && !doc.current_line().trim().is_empty()
}

/// A suggestion offered for the focused document; discarded by any edit other than accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSuggestion {
    pub path: Option<PathBuf>,
    pub cursor: usize,
    pub text: String,
}

impl PendingSuggestion {
    pub fn new(doc: &Document, text: String) -> Self {
        Self {
            path: doc.path().map(Path::to_path_buf),
            cursor: doc.cursor(),
            text,
        }
    }

    pub fn still_valid_for(&self, doc: &Document) -> bool {
        self.path.as_deref() == doc.path() && self.cursor == doc.cursor() && suggestion_applies(doc)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/assistant.rs"]
mod tests;
