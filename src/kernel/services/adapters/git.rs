//! Version control through the `git` command line.

use crate::kernel::services::ports::{
    VcsEntry, VcsError, VcsFileStatus, VcsFileStatusKind, VcsStatus, VersionControl,
};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
    program: String,
}

impl GitCli {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            program: "git".to_string(),
        }
    }

    /// Returns `None` when `dir` is not inside a work tree or git is unavailable.
    pub fn discover(dir: &Path) -> Option<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(dir)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if root.is_empty() {
            return None;
        }
        Some(Self::new(Path::new(&root)))
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn git(&self, args: &[&str]) -> Result<Vec<u8>, VcsError> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.repo_root)
            .output()?;
        if output.status.success() {
            return Ok(output.stdout);
        }
        let mut message = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if message.is_empty() {
            message = String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
        if message.is_empty() {
            message = format!("exit status {}", output.status);
        }
        Err(VcsError::Command {
            command: args.first().copied().unwrap_or_default().to_string(),
            message,
        })
    }
}

impl VersionControl for GitCli {
    fn status(&self) -> Result<VcsStatus, VcsError> {
        let out = self.git(&["status", "--porcelain=v1", "-z", "--branch"])?;
        Ok(parse_status_porcelain_z(&out, &self.repo_root))
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "-m", message])?;
        tracing::info!(repo = %self.repo_root.display(), "committed");
        Ok(())
    }

    fn pull(&self) -> Result<(), VcsError> {
        self.git(&["pull"]).map(|_| ())
    }

    fn push(&self) -> Result<(), VcsError> {
        self.git(&["push"]).map(|_| ())
    }
}

/// Stand-in for projects that are not repositories; every operation reports that.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedVcs;

impl VersionControl for DetachedVcs {
    fn status(&self) -> Result<VcsStatus, VcsError> {
        Err(VcsError::NotARepository)
    }

    fn commit(&self, _message: &str) -> Result<(), VcsError> {
        Err(VcsError::NotARepository)
    }

    fn pull(&self) -> Result<(), VcsError> {
        Err(VcsError::NotARepository)
    }

    fn push(&self) -> Result<(), VcsError> {
        Err(VcsError::NotARepository)
    }
}

pub fn parse_status_porcelain_z(data: &[u8], repo_root: &Path) -> VcsStatus {
    let mut status = VcsStatus::default();
    let mut tokens = data.split(|b| *b == 0).filter(|t| !t.is_empty());
    while let Some(token) = tokens.next() {
        if let Some(header) = token.strip_prefix(b"## ") {
            status.branch = parse_branch_header(&String::from_utf8_lossy(header));
            continue;
        }
        if token.len() < 4 {
            continue;
        }

        let x = token[0] as char;
        let y = token[1] as char;
        if (x == '!' && y == '!') || (x == ' ' && y == ' ') || token[2] != b' ' {
            continue;
        }

        let path = PathBuf::from(String::from_utf8_lossy(&token[3..]).to_string());

        // Renames and copies carry the source path as the next token.
        if x == 'R' || x == 'C' {
            let _ = tokens.next();
        }

        status.entries.push(VcsEntry {
            path: repo_root.join(path),
            status: status_from_xy(x, y),
        });
    }
    status
}

fn parse_branch_header(header: &str) -> Option<String> {
    let header = header.trim();
    if header.starts_with("HEAD (no branch)") {
        return None;
    }
    let header = header
        .strip_prefix("No commits yet on ")
        .or_else(|| header.strip_prefix("Initial commit on "))
        .unwrap_or(header);
    let branch = header.split("...").next().unwrap_or(header);
    let branch = branch.split_whitespace().next().unwrap_or(branch);
    (!branch.is_empty()).then(|| branch.to_string())
}

fn status_from_xy(x: char, y: char) -> VcsFileStatus {
    if x == 'U' || y == 'U' || (x == 'A' && y == 'A') || (x == 'D' && y == 'D') {
        return VcsFileStatus {
            index: Some(VcsFileStatusKind::Conflict),
            worktree: Some(VcsFileStatusKind::Conflict),
        };
    }

    if x == '?' && y == '?' {
        return VcsFileStatus {
            index: Some(VcsFileStatusKind::Untracked),
            worktree: Some(VcsFileStatusKind::Untracked),
        };
    }

    VcsFileStatus {
        index: kind_from_status_char(x),
        worktree: kind_from_status_char(y),
    }
}

fn kind_from_status_char(ch: char) -> Option<VcsFileStatusKind> {
    match ch {
        ' ' => None,
        '?' => Some(VcsFileStatusKind::Untracked),
        'A' => Some(VcsFileStatusKind::Added),
        'U' => Some(VcsFileStatusKind::Conflict),
        _ => Some(VcsFileStatusKind::Modified),
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/services/git.rs"]
mod tests;
