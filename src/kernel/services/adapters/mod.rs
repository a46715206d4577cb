//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod file_watcher;
pub mod git;
pub mod ipc;
pub mod process;
pub mod project_tree;
pub mod runtime;
pub mod settings;
pub mod viewer;

pub use file_watcher::{FileWatcherService, WatchEvent, WatchKind};
pub use git::{DetachedVcs, GitCli};
pub use ipc::{resolve_ipc_dir, AgentPoll, AssistantIpc, AssistantPeer};
pub use project_tree::{should_ignore, LocalProjectTree};
pub use runtime::{AppMessage, AsyncRuntime, VcsOp};
pub use settings::{
    ensure_log_dir, ensure_settings_file, get_log_dir, get_settings_path, load_settings,
};
pub use viewer::SystemViewer;
