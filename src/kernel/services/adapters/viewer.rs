use crate::kernel::services::ports::ExternalViewer;
use std::path::Path;

/// Hands files to the desktop's default handler (usually the browser).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemViewer;

impl ExternalViewer for SystemViewer {
    fn open(&self, path: &Path) -> std::io::Result<()> {
        tracing::info!(path = %path.display(), "opening externally");
        open::that(path)
    }
}
