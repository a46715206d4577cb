use crate::kernel::services::ports::{DirEntryInfo, ProjectTree};
use std::io;
use std::path::{Path, PathBuf};

/// OS and VCS noise that never shows up in the project model.
pub fn should_ignore(name: &str) -> bool {
    matches!(
        name,
        ".DS_Store"
            | ".Spotlight-V100"
            | ".Trashes"
            | ".fseventsd"
            | ".TemporaryItems"
            | "Thumbs.db"
            | "desktop.ini"
            | ".git"
            | "__pycache__"
            | "node_modules"
    )
}

#[derive(Debug, Clone)]
pub struct LocalProjectTree {
    root: PathBuf,
}

impl LocalProjectTree {
    pub fn new(root: &Path) -> Self {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        Self { root }
    }
}

impl ProjectTree for LocalProjectTree {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if should_ignore(&name) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(DirEntryInfo { name, is_dir });
        }
        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }
}
