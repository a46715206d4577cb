use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsFileStatusKind {
    Modified,
    Added,
    Untracked,
    Conflict,
}

impl VcsFileStatusKind {
    pub fn marker(self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Untracked => '?',
            Self::Conflict => 'U',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VcsFileStatus {
    pub index: Option<VcsFileStatusKind>,
    pub worktree: Option<VcsFileStatusKind>,
}

impl VcsFileStatus {
    pub fn primary_kind(&self) -> Option<VcsFileStatusKind> {
        let has = |kind| self.index == Some(kind) || self.worktree == Some(kind);
        [
            VcsFileStatusKind::Conflict,
            VcsFileStatusKind::Untracked,
            VcsFileStatusKind::Added,
            VcsFileStatusKind::Modified,
        ]
        .into_iter()
        .find(|kind| has(*kind))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsEntry {
    pub path: PathBuf,
    pub status: VcsFileStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VcsStatus {
    pub branch: Option<String>,
    pub entries: Vec<VcsEntry>,
}

impl VcsStatus {
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-line form, e.g. `main | 2 changed`.
    pub fn summary(&self) -> String {
        let branch = self.branch.as_deref().unwrap_or("(detached)");
        if self.is_clean() {
            format!("{branch} | clean")
        } else {
            format!("{branch} | {} changed", self.entries.len())
        }
    }
}

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("not a version-controlled project")]
    NotARepository,
    #[error("`git {command}` failed: {message}")]
    Command { command: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait VersionControl: Send + Sync {
    fn status(&self) -> Result<VcsStatus, VcsError>;

    /// Stages every change and commits it.
    fn commit(&self, message: &str) -> Result<(), VcsError>;

    fn pull(&self) -> Result<(), VcsError>;

    fn push(&self) -> Result<(), VcsError>;
}
