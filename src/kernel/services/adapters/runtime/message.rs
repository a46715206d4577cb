use crate::kernel::execution::ProcessId;
use crate::kernel::services::ports::{ConsoleStream, DirEntryInfo, VcsStatus};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsOp {
    Commit { message: String },
    Pull,
    Push,
}

impl VcsOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Commit { .. } => "commit",
            Self::Pull => "pull",
            Self::Push => "push",
        }
    }
}

#[derive(Debug)]
pub enum AppMessage {
    ProcessSpawned {
        process: ProcessId,
        pid: Option<u32>,
    },
    ProcessOutput {
        process: ProcessId,
        stream: ConsoleStream,
        bytes: Vec<u8>,
    },
    ProcessExited {
        process: ProcessId,
        code: Option<i32>,
    },
    ProcessLaunchFailed {
        process: ProcessId,
        program: String,
        error: String,
    },
    DirLoaded {
        path: PathBuf,
        entries: Vec<DirEntryInfo>,
    },
    DirLoadError {
        path: PathBuf,
        error: String,
    },
    VcsStatusUpdated {
        status: VcsStatus,
    },
    VcsStatusError {
        error: String,
    },
    VcsOpFinished {
        op: VcsOp,
        result: Result<(), String>,
    },
    ViewerFailed {
        path: PathBuf,
        error: String,
    },
}
