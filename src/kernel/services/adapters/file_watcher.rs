use super::project_tree::should_ignore;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, SystemTime};

const WATCHER_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    File,
    Directory,
}

/// `File` names an open document whose bytes changed on disk; `Directory` names a project
/// directory whose listing changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchKind,
}

impl WatchEvent {
    pub fn file(path: PathBuf) -> Self {
        Self {
            path,
            kind: WatchKind::File,
        }
    }

    pub fn directory(path: PathBuf) -> Self {
        Self {
            path,
            kind: WatchKind::Directory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FsDelta {
    Created { path: PathBuf },
    Deleted { path: PathBuf },
    Renamed { from: PathBuf, to: PathBuf },
    Modified { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileFingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

#[derive(Default)]
struct DrainBuckets {
    dirs_changed: FxHashSet<PathBuf>,
    files_modified: FxHashSet<PathBuf>,
}

pub struct FileWatcherService {
    watcher: RecommendedWatcher,
    raw_event_rx: mpsc::Receiver<notify::Event>,
    project_root: PathBuf,
    open_file_keys: FxHashMap<PathBuf, FxHashSet<PathBuf>>,
    open_file_fingerprints: FxHashMap<PathBuf, FileFingerprint>,
}

impl FileWatcherService {
    pub fn new(project_root: &Path) -> Result<Self, notify::Error> {
        let project_root = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());
        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                let Ok(event) = res else { return };
                let _ = tx.send(event);
            },
            Config::default().with_poll_interval(WATCHER_POLL_INTERVAL),
        )?;
        watcher.watch(&project_root, RecursiveMode::Recursive)?;
        tracing::info!(root = %project_root.display(), "watching project");
        Ok(Self {
            watcher,
            raw_event_rx: rx,
            project_root,
            open_file_keys: FxHashMap::default(),
            open_file_fingerprints: FxHashMap::default(),
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Replaces the set of open document paths.
    pub fn sync_open_files<'a, I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut seen = FxHashSet::default();
        let mut open_file_keys: FxHashMap<PathBuf, FxHashSet<PathBuf>> = FxHashMap::default();
        let mut open_file_fingerprints: FxHashMap<PathBuf, FileFingerprint> = FxHashMap::default();

        for path in paths {
            let path = path.to_path_buf();
            if !seen.insert(path.clone()) {
                continue;
            }

            for key in path_identity_keys(path.as_path(), self.project_root.as_path()) {
                open_file_keys.entry(key).or_default().insert(path.clone());
            }

            if let Some(existing) = self.open_file_fingerprints.get(&path).cloned() {
                open_file_fingerprints.insert(path, existing);
            } else if let Some(fingerprint) = file_fingerprint(path.as_path()) {
                open_file_fingerprints.insert(path, fingerprint);
            }
        }

        self.open_file_keys = open_file_keys;
        self.open_file_fingerprints = open_file_fingerprints;
    }

    /// Records the current on-disk state of a file the workbench itself just wrote.
    pub fn acknowledge_write(&mut self, path: &Path) {
        for open_path in self.match_open_paths(path) {
            if let Some(fingerprint) = file_fingerprint(open_path.as_path()) {
                self.open_file_fingerprints.insert(open_path, fingerprint);
            } else {
                self.open_file_fingerprints.remove(&open_path);
            }
        }
    }

    /// Directory events first, then file events; each sorted and deduplicated.
    pub fn drain_events(&mut self) -> Vec<WatchEvent> {
        let _watcher_guard = &self.watcher;

        let mut buckets = DrainBuckets::default();
        while let Ok(event) = self.raw_event_rx.try_recv() {
            for delta in normalize_notify_event(event) {
                self.route_delta(delta, &mut buckets);
            }
        }

        let DrainBuckets {
            dirs_changed,
            files_modified,
        } = buckets;

        let mut dirs = dirs_changed.into_iter().collect::<Vec<_>>();
        dirs.sort_unstable();
        let mut files = files_modified.into_iter().collect::<Vec<_>>();
        files.sort_unstable();

        dirs.into_iter()
            .map(WatchEvent::directory)
            .chain(files.into_iter().map(WatchEvent::file))
            .collect()
    }

    fn route_delta(&mut self, delta: FsDelta, buckets: &mut DrainBuckets) {
        match delta {
            FsDelta::Modified { path } => {
                let matched_open_paths = self.match_open_paths(path.as_path());
                let is_open_path = !matched_open_paths.is_empty();

                for open_path in matched_open_paths {
                    if self.refresh_open_file_fingerprint(open_path.as_path()) {
                        buckets.files_modified.insert(open_path);
                    }
                }

                if !is_open_path {
                    self.mark_dir_changed(path.as_path(), &mut buckets.dirs_changed);
                }
            }
            FsDelta::Deleted { path } => {
                for open_path in self.match_open_paths(path.as_path()) {
                    self.open_file_fingerprints.remove(&open_path);
                }
                self.mark_parent_changed(path.as_path(), &mut buckets.dirs_changed);
            }
            FsDelta::Created { path } => {
                for open_path in self.match_open_paths(path.as_path()) {
                    if self.refresh_open_file_fingerprint(open_path.as_path()) {
                        buckets.files_modified.insert(open_path);
                    }
                }
                self.mark_parent_changed(path.as_path(), &mut buckets.dirs_changed);
            }
            FsDelta::Renamed { from, to } => {
                for open_path in self.match_open_paths(from.as_path()) {
                    self.open_file_fingerprints.remove(&open_path);
                }
                for open_path in self.match_open_paths(to.as_path()) {
                    if self.refresh_open_file_fingerprint(open_path.as_path()) {
                        buckets.files_modified.insert(open_path);
                    }
                }
                self.mark_parent_changed(from.as_path(), &mut buckets.dirs_changed);
                self.mark_parent_changed(to.as_path(), &mut buckets.dirs_changed);
            }
        }
    }

    fn mark_dir_changed(&self, path: &Path, dirs_changed: &mut FxHashSet<PathBuf>) {
        let raw = raw_absolute_path(path, self.project_root.as_path());
        let candidate_dir = match std::fs::metadata(&raw) {
            Ok(meta) if meta.is_dir() => Some(raw.as_path()),
            _ => raw.parent(),
        };
        if let Some(dir) = candidate_dir.and_then(|p| self.to_project_path(p)) {
            dirs_changed.insert(dir);
        }
    }

    fn mark_parent_changed(&self, path: &Path, dirs_changed: &mut FxHashSet<PathBuf>) {
        let raw = raw_absolute_path(path, self.project_root.as_path());
        if contains_ignored_component(&raw, &self.project_root) {
            return;
        }
        if let Some(parent) = raw.parent().and_then(|p| self.to_project_path(p)) {
            dirs_changed.insert(parent);
        }
    }

    fn refresh_open_file_fingerprint(&mut self, path: &Path) -> bool {
        match file_fingerprint(path) {
            Some(new_fingerprint) => {
                if let Some(previous) = self
                    .open_file_fingerprints
                    .insert(path.to_path_buf(), new_fingerprint.clone())
                {
                    previous != new_fingerprint
                } else {
                    true
                }
            }
            None => self.open_file_fingerprints.remove(path).is_some(),
        }
    }

    fn to_project_path(&self, path: &Path) -> Option<PathBuf> {
        let raw = raw_absolute_path(path, self.project_root.as_path());
        let root = self.project_root.as_path();

        let resolved = if raw.starts_with(root) {
            Some(raw)
        } else {
            raw.canonicalize()
                .ok()
                .filter(|canonical| canonical.starts_with(root))
        }?;

        if contains_ignored_component(resolved.as_path(), root) {
            return None;
        }
        Some(resolved)
    }

    fn match_open_paths(&self, path: &Path) -> FxHashSet<PathBuf> {
        let mut matched = FxHashSet::default();
        for key in path_identity_keys(path, self.project_root.as_path()) {
            if let Some(paths) = self.open_file_keys.get(&key) {
                matched.extend(paths.iter().cloned());
            }
        }
        matched
    }
}

fn raw_absolute_path(path: &Path, project_root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

fn path_identity_keys(path: &Path, project_root: &Path) -> Vec<PathBuf> {
    let raw = raw_absolute_path(path, project_root);
    let mut keys = vec![raw.clone()];
    if let Ok(canonical) = raw.canonicalize() {
        if canonical != raw {
            keys.push(canonical);
        }
    }
    keys
}

fn contains_ignored_component(path: &Path, project_root: &Path) -> bool {
    let relative = path.strip_prefix(project_root).unwrap_or(path);
    relative.components().any(|component| {
        if let Component::Normal(name) = component {
            should_ignore(&name.to_string_lossy())
        } else {
            false
        }
    })
}

fn file_fingerprint(path: &Path) -> Option<FileFingerprint> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }

    Some(FileFingerprint {
        len: metadata.len(),
        modified: metadata.modified().ok(),
    })
}

fn normalize_notify_event(event: notify::Event) -> Vec<FsDelta> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .into_iter()
            .map(|path| FsDelta::Created { path })
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .into_iter()
            .map(|path| FsDelta::Deleted { path })
            .collect(),
        EventKind::Modify(kind) => normalize_modify_event(kind, event.paths),
        _ => Vec::new(),
    }
}

fn normalize_modify_event(kind: ModifyKind, paths: Vec<PathBuf>) -> Vec<FsDelta> {
    match kind {
        ModifyKind::Name(RenameMode::Both) => {
            if paths.len() >= 2 {
                vec![FsDelta::Renamed {
                    from: paths[0].clone(),
                    to: paths[1].clone(),
                }]
            } else {
                paths
                    .into_iter()
                    .map(|path| FsDelta::Modified { path })
                    .collect()
            }
        }
        ModifyKind::Name(RenameMode::From) => paths
            .into_iter()
            .map(|path| FsDelta::Deleted { path })
            .collect(),
        ModifyKind::Name(RenameMode::To) => paths
            .into_iter()
            .map(|path| FsDelta::Created { path })
            .collect(),
        ModifyKind::Data(_)
        | ModifyKind::Any
        | ModifyKind::Other
        | ModifyKind::Metadata(_)
        | ModifyKind::Name(_) => paths
            .into_iter()
            .map(|path| FsDelta::Modified { path })
            .collect(),
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/services/file_watcher.rs"]
mod tests;
