use std::path::Path;

/// Opens browser-renderable files outside the workbench.
pub trait ExternalViewer: Send + Sync {
    fn open(&self, path: &Path) -> std::io::Result<()>;
}
