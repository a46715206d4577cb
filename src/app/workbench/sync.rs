use super::Workbench;
use crate::kernel::document::DocumentId;
use crate::kernel::error::{Result, WorkbenchError};
use crate::kernel::services::adapters::WatchKind;
use crate::kernel::services::ports::ConsoleLevel;
use std::path::{Path, PathBuf};

impl Workbench {
    pub(super) fn poll_file_watcher(&mut self) -> bool {
        let Some(watcher) = self.watcher.as_mut() else {
            return false;
        };
        let events = watcher.drain_events();
        if events.is_empty() {
            return false;
        }

        let mut refresh_vcs = false;
        for event in events {
            match event.kind {
                WatchKind::Directory => {
                    tracing::debug!(path = %event.path.display(), "directory changed");
                    self.load_dir(event.path);
                    refresh_vcs = true;
                }
                WatchKind::File => match self.reload_if_changed(&event.path) {
                    Ok(reloaded) => refresh_vcs |= reloaded,
                    Err(err) => {
                        tracing::warn!(error = %err, "external change skipped");
                        self.console.notify(ConsoleLevel::Warning, &err.to_string());
                    }
                },
            }
        }

        if refresh_vcs {
            self.refresh_vcs_status();
        }
        true
    }

    /// Brings every document open on `path` in line with the file on disk.
    ///
    /// Returns whether any buffer was replaced. Content equal to what was last saved or
    /// loaded is a no-op; otherwise unsaved edits are overwritten.
    pub fn reload_if_changed(&mut self, path: &Path) -> Result<bool> {
        let targets = self.documents_at(path);
        if targets.is_empty() {
            return Ok(false);
        }

        let content = read_utf8(path)?;
        let mut reloaded = false;
        for id in targets {
            let Some(doc) = self.documents.get_mut(id) else {
                continue;
            };
            if doc.matches_saved(&content) {
                continue;
            }
            doc.reload_from_disk(&content);
            let name = doc.display_name();
            reloaded = true;
            if self.focus == Some(id) {
                self.discard_suggestion();
            }
            tracing::info!(path = %path.display(), "buffer reloaded from disk");
            self.console
                .notify(ConsoleLevel::Info, &format!("{name} changed on disk; reloaded"));
        }
        Ok(reloaded)
    }

    pub(super) fn acknowledge_write(&mut self, path: &Path) {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.acknowledge_write(path);
        }
    }

    pub(super) fn sync_watched_documents(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        let paths: Vec<PathBuf> = self
            .documents
            .values()
            .filter_map(|doc| doc.path().map(Path::to_path_buf))
            .collect();
        watcher.sync_open_files(paths.iter().map(PathBuf::as_path));
    }

    fn documents_at(&self, path: &Path) -> Vec<DocumentId> {
        let same = |candidate: &Path| {
            candidate == path
                || std::fs::canonicalize(candidate)
                    .ok()
                    .zip(std::fs::canonicalize(path).ok())
                    .is_some_and(|(a, b)| a == b)
        };
        self.tabs
            .iter()
            .copied()
            .filter(|id| {
                self.documents
                    .get(*id)
                    .and_then(|doc| doc.path())
                    .is_some_and(|candidate| same(candidate))
            })
            .collect()
    }
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| WorkbenchError::WatcherRead {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|e| WorkbenchError::WatcherRead {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}
