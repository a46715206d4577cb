//! The coordinating workbench: owns every document, the execution job and the assistant channel.
//!
//! All mutations happen on the thread that calls into the workbench. Background work (child
//! processes, git, directory listings) runs on the async runtime and reports back through
//! `AppMessage`s, which `tick` drains.

use crate::app::console::LineBuffer;
use crate::kernel::assistant::PendingSuggestion;
use crate::kernel::document::{Document, DocumentId};
use crate::kernel::error::{Result, WorkbenchError};
use crate::kernel::execution::{Orchestrator, ProcessId};
use crate::kernel::language::LanguageId;
use crate::kernel::services::adapters::{
    resolve_ipc_dir, AppMessage, AssistantIpc, AsyncRuntime, DetachedVcs, FileWatcherService,
    GitCli, LocalProjectTree, SystemViewer, VcsOp,
};
use crate::kernel::services::ports::{
    Console, ConsoleLevel, ConsoleStream, DirEntryInfo, ExternalViewer, ProjectTree, Settings,
    VcsStatus, VersionControl,
};
use crate::kernel::theme::{Theme, ANSI_RESET};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::collections::VecDeque;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod assistant;
mod run;
mod sync;
mod tick;

const MAX_MESSAGE_DRAIN_PER_TICK: usize = 1024;
const LOG_BUFFER_CAP: usize = 2000;
const MAX_LOG_DRAIN_PER_TICK: usize = 1024;

/// External collaborators the workbench drives.
#[derive(Clone)]
pub struct WorkbenchServices {
    pub vcs: Arc<dyn VersionControl>,
    pub tree: Arc<dyn ProjectTree>,
    pub viewer: Arc<dyn ExternalViewer>,
}

impl WorkbenchServices {
    /// Git if `root` is inside a repository, the local filesystem, and the desktop viewer.
    pub fn local(root: &Path) -> Self {
        let vcs: Arc<dyn VersionControl> = match GitCli::discover(root) {
            Some(git) => Arc::new(git),
            None => Arc::new(DetachedVcs),
        };
        Self {
            vcs,
            tree: Arc::new(LocalProjectTree::new(root)),
            viewer: Arc::new(SystemViewer),
        }
    }
}

pub struct Workbench {
    root: PathBuf,
    settings: Settings,
    theme: Theme,
    documents: SlotMap<DocumentId, Document>,
    tabs: Vec<DocumentId>,
    focus: Option<DocumentId>,
    orchestrator: Orchestrator,
    ipc: Option<AssistantIpc>,
    runtime: AsyncRuntime,
    rx: Receiver<AppMessage>,
    watcher: Option<FileWatcherService>,
    console: Box<dyn Console>,
    services: WorkbenchServices,
    output_buffers: FxHashMap<(ProcessId, ConsoleStream), LineBuffer>,
    pending_completion_deadline: Option<Instant>,
    completion_target: Option<DocumentId>,
    next_completion_poll: Instant,
    next_agent_poll: Instant,
    suggestion: Option<PendingSuggestion>,
    project_entries: FxHashMap<PathBuf, Vec<DirEntryInfo>>,
    vcs_status: Option<VcsStatus>,
    vcs_status_requested: bool,
    log_rx: Option<Receiver<String>>,
    logs: VecDeque<String>,
}

impl Workbench {
    pub fn new(root: &Path, settings: Settings, console: Box<dyn Console>) -> Result<Self> {
        let services = WorkbenchServices::local(root);
        Self::with_services(root, settings, console, services)
    }

    pub fn with_services(
        root: &Path,
        settings: Settings,
        mut console: Box<dyn Console>,
        services: WorkbenchServices,
    ) -> Result<Self> {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let (tx, rx) = mpsc::channel();
        let runtime = AsyncRuntime::new(tx)?;

        let theme = Theme::for_mode(settings.dark_mode);
        console.set_theme(&theme);

        let watcher = match FileWatcherService::new(&root) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "file watcher unavailable");
                console.notify(
                    ConsoleLevel::Warning,
                    &format!("live sync disabled: {e}"),
                );
                None
            }
        };

        let ipc = match resolve_ipc_dir(&settings) {
            Some(dir) => match AssistantIpc::open(dir.clone()) {
                Ok(ipc) => {
                    ipc.clear();
                    tracing::info!(dir = %dir.display(), "assistant channel ready");
                    Some(ipc)
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "assistant channel unavailable");
                    None
                }
            },
            None => None,
        };

        let now = Instant::now();
        let workbench = Self {
            orchestrator: Orchestrator::new(settings.toolchain.clone()),
            next_completion_poll: now + settings.completion_poll(),
            next_agent_poll: now + settings.agent_poll(),
            root,
            settings,
            theme,
            documents: SlotMap::with_key(),
            tabs: Vec::new(),
            focus: None,
            ipc,
            runtime,
            rx,
            watcher,
            console,
            services,
            output_buffers: FxHashMap::default(),
            pending_completion_deadline: None,
            completion_target: None,
            suggestion: None,
            project_entries: FxHashMap::default(),
            vcs_status: None,
            vcs_status_requested: false,
            log_rx: None,
            logs: VecDeque::new(),
        };

        workbench.load_dir(workbench.root.clone());
        workbench.refresh_vcs_status();
        Ok(workbench)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn ipc(&self) -> Option<&AssistantIpc> {
        self.ipc.as_ref()
    }

    pub fn vcs_status(&self) -> Option<&VcsStatus> {
        self.vcs_status.as_ref()
    }

    pub fn project_entries(&self, path: &Path) -> Option<&[DirEntryInfo]> {
        self.project_entries.get(path).map(Vec::as_slice)
    }

    /// Receives formatted log lines; drained on every tick.
    pub fn set_log_receiver(&mut self, rx: Receiver<String>) {
        self.log_rx = Some(rx);
    }

    /// The last `n` log lines, oldest first.
    pub fn recent_logs(&self, n: usize) -> impl Iterator<Item = &str> {
        self.logs
            .iter()
            .skip(self.logs.len().saturating_sub(n))
            .map(String::as_str)
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = (DocumentId, &Document)> {
        self.tabs
            .iter()
            .filter_map(|id| self.documents.get(*id).map(|doc| (*id, doc)))
    }

    pub fn focused(&self) -> Option<DocumentId> {
        self.focus
    }

    pub fn focused_document(&self) -> Option<&Document> {
        self.focus.and_then(|id| self.documents.get(id))
    }

    pub fn focus(&mut self, id: DocumentId) -> bool {
        if !self.documents.contains_key(id) {
            return false;
        }
        if self.focus != Some(id) {
            self.focus = Some(id);
            self.discard_suggestion();
        }
        true
    }

    pub fn find_document(&self, path: &Path) -> Option<DocumentId> {
        let path = self.resolve(path);
        self.tabs
            .iter()
            .copied()
            .find(|id| self.documents.get(*id).and_then(Document::path) == Some(path.as_path()))
    }

    /// Opens `path` (relative paths resolve against the project root), or focuses it if it is
    /// already open.
    pub fn open(&mut self, path: &Path) -> Result<DocumentId> {
        if let Some(id) = self.find_document(path) {
            self.focus(id);
            return Ok(id);
        }
        let path = self.resolve(path);
        let doc = Document::open(&path, self.theme.clone())?;
        tracing::info!(path = %path.display(), language = %doc.language(), "document opened");
        Ok(self.insert_document(doc))
    }

    /// A new empty buffer bound to `path`; an existing file is opened instead.
    pub fn new_file(&mut self, path: &Path) -> Result<DocumentId> {
        let resolved = self.resolve(path);
        if resolved.exists() {
            return self.open(&resolved);
        }
        let language = LanguageId::from_path(&resolved);
        let doc = Document::new(Some(resolved), language, "", self.theme.clone())?;
        Ok(self.insert_document(doc))
    }

    pub fn close(&mut self, id: DocumentId) -> bool {
        if self.documents.remove(id).is_none() {
            return false;
        }
        self.tabs.retain(|tab| *tab != id);
        if self.focus == Some(id) {
            self.focus = self.tabs.last().copied();
            self.discard_suggestion();
        }
        if self.completion_target == Some(id) {
            self.completion_target = None;
            self.pending_completion_deadline = None;
        }
        self.sync_watched_documents();
        true
    }

    /// Inserts at the cursor of the focused document and re-arms the completion debounce.
    pub fn insert(&mut self, text: &str) -> Result<()> {
        let id = self.focus.ok_or(WorkbenchError::NoDocument)?;
        let doc = self
            .documents
            .get_mut(id)
            .ok_or(WorkbenchError::NoDocument)?;
        doc.insert(text);
        self.discard_suggestion();
        self.arm_completion(id);
        Ok(())
    }

    pub fn newline(&mut self) -> Result<()> {
        self.insert("\n")
    }

    pub fn set_cursor(&mut self, char_idx: usize) -> Result<()> {
        let doc = self.focused_document_mut()?;
        doc.set_cursor(char_idx);
        self.discard_suggestion();
        Ok(())
    }

    pub fn move_cursor_to_end(&mut self) -> Result<()> {
        let doc = self.focused_document_mut()?;
        doc.move_cursor_to_end();
        self.discard_suggestion();
        Ok(())
    }

    pub fn save(&mut self) -> Result<PathBuf> {
        let doc = self.focused_document_mut()?;
        let path = doc.save()?;
        let name = doc.display_name();
        self.acknowledge_write(&path);
        self.console
            .notify(ConsoleLevel::Info, &format!("Saved {name}"));
        self.refresh_vcs_status();
        Ok(path)
    }

    pub fn set_theme(&mut self, dark: bool) {
        self.theme = Theme::for_mode(dark);
        self.settings.dark_mode = dark;
        for doc in self.documents.values_mut() {
            doc.set_theme(self.theme.clone());
        }
        self.console.set_theme(&self.theme);
    }

    /// ANSI-coloured lines of the focused document, highlighted from the cached line states.
    pub fn styled_lines(&mut self, lines: Range<usize>) -> Result<Vec<String>> {
        let doc = self.focused_document_mut()?;
        let first = lines.start;
        let highlights = doc.highlight_lines(lines);
        let mut out = Vec::with_capacity(highlights.len());
        for (offset, highlight) in highlights.into_iter().enumerate() {
            let text = doc.line_text(first + offset);
            let theme = doc.highlighter().theme();
            let mut line = String::with_capacity(text.len() + 16 * highlight.spans.len());
            let mut at = 0usize;
            for span in &highlight.spans {
                line.push_str(&text[at..span.start]);
                line.push_str(&theme.style_for(span.kind).ansi());
                line.push_str(&text[span.range()]);
                line.push_str(ANSI_RESET);
                at = span.end;
            }
            line.push_str(&text[at..]);
            out.push(line);
        }
        Ok(out)
    }

    pub fn notify(&mut self, level: ConsoleLevel, message: &str) {
        self.console.notify(level, message);
    }

    pub fn load_dir(&self, path: PathBuf) {
        self.runtime.load_dir(self.services.tree.clone(), path);
    }

    pub fn refresh_vcs_status(&self) {
        self.runtime.refresh_vcs_status(self.services.vcs.clone());
    }

    /// Like `refresh_vcs_status`, but the result is reported on the console.
    pub fn request_vcs_status(&mut self) {
        self.vcs_status_requested = true;
        self.refresh_vcs_status();
    }

    pub fn commit(&mut self, message: &str) {
        self.run_vcs_op(VcsOp::Commit {
            message: message.to_string(),
        });
    }

    pub fn pull(&mut self) {
        self.run_vcs_op(VcsOp::Pull);
    }

    pub fn push(&mut self) {
        self.run_vcs_op(VcsOp::Push);
    }

    fn run_vcs_op(&mut self, op: VcsOp) {
        self.console
            .notify(ConsoleLevel::Info, &format!("git {} ...", op.name()));
        self.runtime.run_vcs_op(self.services.vcs.clone(), op);
    }

    /// Stops any running program, removes the exchange files and stops the runtime.
    pub fn shutdown(mut self) {
        let step = self.orchestrator.interrupt();
        self.apply_step(step);
        if let Some(ipc) = &self.ipc {
            ipc.clear();
        }
        tracing::info!("workbench shut down");
        self.runtime.shutdown();
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn insert_document(&mut self, doc: Document) -> DocumentId {
        let id = self.documents.insert(doc);
        self.tabs.push(id);
        self.focus = Some(id);
        self.discard_suggestion();
        self.sync_watched_documents();
        id
    }

    fn focused_document_mut(&mut self) -> Result<&mut Document> {
        let id = self.focus.ok_or(WorkbenchError::NoDocument)?;
        self.documents.get_mut(id).ok_or(WorkbenchError::NoDocument)
    }

    fn arm_completion(&mut self, id: DocumentId) {
        if self.ipc.is_none() {
            return;
        }
        self.completion_target = Some(id);
        self.pending_completion_deadline = Some(Instant::now() + self.settings.completion_debounce());
    }

    fn discard_suggestion(&mut self) {
        self.suggestion = None;
    }

    fn poll_due(deadline: &mut Instant, period: Duration, now: Instant) -> bool {
        if now < *deadline {
            return false;
        }
        *deadline = now + period;
        true
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/app/workbench.rs"]
mod tests;
