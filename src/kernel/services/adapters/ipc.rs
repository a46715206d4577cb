//! File-based exchange with the external assistant.
//!
//! The existence of a request file is the request; removing a response file consumes it.
//! Writers create a temporary sibling and rename it into place. Readers consume by renaming
//! the file to a private name first, so a file is never read half-written or read twice.

use crate::kernel::assistant::{AgentKind, AgentRequest, AgentResponse, CompletionRequest};
use crate::kernel::error::{Result, WorkbenchError};
use crate::kernel::services::ports::Settings;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub const COMPLETION_REQUEST_FILE: &str = "completion_request.json";
pub const COMPLETION_RESPONSE_FILE: &str = "completion_response.txt";
pub const AGENT_REQUEST_FILE: &str = "agent_request.json";
pub const AGENT_RESPONSE_FILE: &str = "agent_response.json";

pub const IPC_DIR_ENV: &str = "FORGEBENCH_IPC_DIR";
const DEFAULT_IPC_DIR: &str = ".forgebench_ipc";

static CONSUME_SEQ: AtomicU64 = AtomicU64::new(0);

/// `FORGEBENCH_IPC_DIR`, then the configured directory, then `~/.forgebench_ipc`.
pub fn resolve_ipc_dir(settings: &Settings) -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(IPC_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    if let Some(dir) = &settings.ipc_dir {
        return Some(dir.clone());
    }
    home_dir().map(|home| home.join(DEFAULT_IPC_DIR))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentPoll {
    Empty,
    /// A response for a request that is no longer outstanding; already removed.
    Stale,
    Response(AgentResponse),
}

/// Workbench side of the exchange.
#[derive(Debug)]
pub struct AssistantIpc {
    dir: PathBuf,
    next_request_id: u64,
    outstanding_agent: Option<u64>,
}

impl AssistantIpc {
    pub fn open(dir: PathBuf) -> io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            next_request_id: 1,
            outstanding_agent: None,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn allocate_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    pub fn outstanding_agent(&self) -> Option<u64> {
        self.outstanding_agent
    }

    /// A completion request or an unconsumed response exists.
    pub fn completion_in_flight(&self) -> bool {
        self.path(COMPLETION_REQUEST_FILE).exists() || self.path(COMPLETION_RESPONSE_FILE).exists()
    }

    /// Writes the request unless one is already in flight; returns whether it was written.
    pub fn send_completion(&self, request: &CompletionRequest) -> Result<bool> {
        if self.completion_in_flight() {
            return Ok(false);
        }
        let bytes = serde_json::to_vec(request).map_err(io::Error::other)?;
        write_atomically(&self.path(COMPLETION_REQUEST_FILE), &bytes)?;
        tracing::debug!(request_id = request.request_id, "completion request written");
        Ok(true)
    }

    pub fn take_completion(&self) -> Result<Option<String>> {
        let path = self.path(COMPLETION_RESPONSE_FILE);
        let Some(bytes) = consume(&path)? else {
            return Ok(None);
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| WorkbenchError::IpcMalformed {
                path,
                reason: e.to_string(),
            })
    }

    pub fn send_agent(&mut self, kind: AgentKind, file_path: &Path, request: &str) -> Result<u64> {
        let request_id = self.allocate_request_id();
        let payload = AgentRequest {
            kind,
            file_path: file_path.to_path_buf(),
            request: request.to_string(),
            request_id,
        };
        let bytes = serde_json::to_vec(&payload).map_err(io::Error::other)?;
        write_atomically(&self.path(AGENT_REQUEST_FILE), &bytes)?;
        self.outstanding_agent = Some(request_id);
        tracing::info!(request_id, kind = kind.label(), "agent request written");
        Ok(request_id)
    }

    pub fn take_agent(&mut self) -> Result<AgentPoll> {
        let path = self.path(AGENT_RESPONSE_FILE);
        let Some(response) = consume_json::<AgentResponse>(&path)? else {
            return Ok(AgentPoll::Empty);
        };
        if !response.answers(self.outstanding_agent) {
            tracing::info!(
                request_id = ?response.request_id,
                outstanding = ?self.outstanding_agent,
                "stale agent response discarded"
            );
            return Ok(AgentPoll::Stale);
        }
        self.outstanding_agent = None;
        Ok(AgentPoll::Response(response))
    }

    /// Removes every exchange file so the next session starts clean.
    pub fn clear(&self) {
        for file in [
            COMPLETION_REQUEST_FILE,
            COMPLETION_RESPONSE_FILE,
            AGENT_REQUEST_FILE,
            AGENT_RESPONSE_FILE,
        ] {
            let _ = std::fs::remove_file(self.path(file));
        }
    }
}

/// Assistant side of the exchange.
#[derive(Debug, Clone)]
pub struct AssistantPeer {
    dir: PathBuf,
}

impl AssistantPeer {
    pub fn open(dir: PathBuf) -> io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn take_completion_request(&self) -> Result<Option<CompletionRequest>> {
        consume_json(&self.dir.join(COMPLETION_REQUEST_FILE))
    }

    pub fn respond_completion(&self, suggestion: &str) -> io::Result<()> {
        write_atomically(&self.dir.join(COMPLETION_RESPONSE_FILE), suggestion.as_bytes())
    }

    pub fn take_agent_request(&self) -> Result<Option<AgentRequest>> {
        consume_json(&self.dir.join(AGENT_REQUEST_FILE))
    }

    pub fn respond_agent(&self, response: &AgentResponse) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(response).map_err(io::Error::other)?;
        write_atomically(&self.dir.join(AGENT_RESPONSE_FILE), &bytes)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })
}

/// Claims `path` by renaming it, reads it, and deletes the claimed copy.
fn consume(path: &Path) -> Result<Option<Vec<u8>>> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let seq = CONSUME_SEQ.fetch_add(1, Ordering::Relaxed);
    let claimed = path.with_file_name(format!(
        ".{file_name}.{}.{seq}.claimed",
        std::process::id()
    ));
    match std::fs::rename(path, &claimed) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let read = std::fs::read(&claimed);
    let _ = std::fs::remove_file(&claimed);
    Ok(Some(read?))
}

fn consume_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(bytes) = consume(path)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| WorkbenchError::IpcMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
#[path = "../../../../tests/unit/services/ipc.rs"]
mod tests;
