use super::Workbench;
use crate::kernel::assistant::{
    completion_request, suggestion_from_response, AgentKind, PendingSuggestion,
    DEFAULT_REFACTOR_REQUEST, TEST_GEN_REQUEST,
};
use crate::kernel::error::{Result, WorkbenchError};
use crate::kernel::services::adapters::AgentPoll;
use crate::kernel::services::ports::ConsoleLevel;

impl Workbench {
    /// The pending suggestion, while it still applies to the focused document.
    pub fn suggestion(&self) -> Option<&str> {
        let suggestion = self.suggestion.as_ref()?;
        let doc = self.focused_document()?;
        suggestion
            .still_valid_for(doc)
            .then_some(suggestion.text.as_str())
    }

    /// Inserts the pending suggestion at the cursor; returns `false` if there is none.
    pub fn accept_suggestion(&mut self) -> Result<bool> {
        let Some(suggestion) = self.suggestion.take() else {
            return Ok(false);
        };
        let id = self.focus.ok_or(WorkbenchError::NoDocument)?;
        let Some(doc) = self.documents.get_mut(id) else {
            return Err(WorkbenchError::NoDocument);
        };
        if !suggestion.still_valid_for(doc) {
            return Ok(false);
        }
        doc.insert(&suggestion.text);
        self.arm_completion(id);
        Ok(true)
    }

    pub fn request_refactor(&mut self, instruction: Option<&str>) -> Result<u64> {
        let request = instruction
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_REFACTOR_REQUEST)
            .to_string();
        self.request_agent(AgentKind::Refactor, &request)
    }

    pub fn request_tests(&mut self) -> Result<u64> {
        self.request_agent(AgentKind::TestGen, TEST_GEN_REQUEST)
    }

    fn request_agent(&mut self, kind: AgentKind, request: &str) -> Result<u64> {
        if self.ipc.is_none() {
            return Err(channel_unavailable());
        }
        let id = self.focus.ok_or(WorkbenchError::NoDocument)?;
        let Some(doc) = self.documents.get_mut(id) else {
            return Err(WorkbenchError::NoDocument);
        };
        let path = doc.save().map_err(|e| WorkbenchError::Unsaved {
            path: doc
                .path()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| doc.display_name().into()),
            reason: e.to_string(),
        })?;
        let name = doc.display_name();
        self.acknowledge_write(&path);

        let Some(ipc) = self.ipc.as_mut() else {
            return Err(channel_unavailable());
        };
        let request_id = ipc.send_agent(kind, &path, request)?;
        self.console.notify(
            ConsoleLevel::Info,
            &format!("Asked the assistant for {} of {name}", kind.label()),
        );
        Ok(request_id)
    }

    /// Writes a completion request for the document the debounce was armed for.
    pub(super) fn request_completion(&mut self) -> bool {
        let Some(id) = self.completion_target else {
            return false;
        };
        if self.focus != Some(id) {
            return false;
        }
        let (Some(ipc), Some(doc)) = (self.ipc.as_mut(), self.documents.get(id)) else {
            return false;
        };
        let request_id = ipc.allocate_request_id();
        let Some(request) = completion_request(doc, self.settings.context_lines, request_id) else {
            return false;
        };
        match ipc.send_completion(&request) {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!("completion request already in flight");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "completion request failed");
                false
            }
        }
    }

    pub(super) fn take_completion_response(&mut self) -> bool {
        let Some(ipc) = self.ipc.as_ref() else {
            return false;
        };
        let raw = match ipc.take_completion() {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "completion response dropped");
                self.console.notify(ConsoleLevel::Warning, &e.to_string());
                return true;
            }
        };

        let Some(text) = suggestion_from_response(&raw) else {
            tracing::debug!("empty or error completion discarded");
            return false;
        };
        let target = self.completion_target;
        let Some(doc) = self
            .focus
            .filter(|id| Some(*id) == target)
            .and_then(|id| self.documents.get(id))
        else {
            return false;
        };
        let pending = PendingSuggestion::new(doc, text);
        if !pending.still_valid_for(doc) {
            return false;
        }
        self.console.notify(
            ConsoleLevel::Info,
            &format!("Suggestion: {} (:accept to insert)", pending.text),
        );
        self.suggestion = Some(pending);
        true
    }

    pub(super) fn take_agent_response(&mut self) -> bool {
        let Some(ipc) = self.ipc.as_mut() else {
            return false;
        };
        let response = match ipc.take_agent() {
            Ok(AgentPoll::Response(response)) => response,
            Ok(AgentPoll::Empty) | Ok(AgentPoll::Stale) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "agent response dropped");
                self.console.notify(ConsoleLevel::Warning, &e.to_string());
                return true;
            }
        };

        if response.success {
            let mut message = response.message.clone();
            if !response.files.is_empty() {
                message.push_str(&format!(" ({})", response.files.join(", ")));
            }
            tracing::info!(files = response.files.len(), "agent request succeeded");
            self.console.notify(ConsoleLevel::Success, &message);
            self.load_dir(self.root.clone());
            self.refresh_vcs_status();
        } else {
            tracing::info!(message = %response.message, "agent request failed");
            self.console.notify(ConsoleLevel::Error, &response.message);
        }
        true
    }
}

fn channel_unavailable() -> WorkbenchError {
    WorkbenchError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "assistant channel is not available",
    ))
}
