use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

pub trait ProjectTree: Send + Sync {
    fn root(&self) -> &Path;

    /// Direct children of `path`, directories first, each group sorted by name.
    fn list(&self, path: &Path) -> std::io::Result<Vec<DirEntryInfo>>;
}
