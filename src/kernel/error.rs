use crate::kernel::language::LanguageId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkbenchError>;

#[derive(Error, Debug)]
pub enum WorkbenchError {
    #[error("invalid highlighting rule for {language}: `{pattern}`: {source}")]
    Configuration {
        language: LanguageId,
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("a process is already running; wait for it or interrupt it")]
    Busy,

    #[error("cannot run unsaved file {}: {reason}", path.display())]
    Unsaved { path: PathBuf, reason: String },

    #[error("compilation failed (exit code {exit_code:?})")]
    Compile {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to start `{program}`: {reason}")]
    ProcessLaunch { program: String, reason: String },

    #[error("malformed assistant payload in {}: {reason}", path.display())]
    IpcMalformed { path: PathBuf, reason: String },

    #[error("cannot read {}: {source}", path.display())]
    WatcherRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no execution command defined for {language} files")]
    Unsupported { language: LanguageId },

    #[error("no document is focused")]
    NoDocument,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
