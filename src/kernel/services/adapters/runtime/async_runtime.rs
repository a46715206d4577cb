use super::message::{AppMessage, VcsOp};
use crate::kernel::execution::{CommandSpec, ProcessId};
use crate::kernel::services::adapters::process::{spawn_supervised, ProcessHandle};
use crate::kernel::services::ports::{ExternalViewer, ProjectTree, VersionControl};
use rustc_hash::FxHashMap;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

pub struct AsyncRuntime {
    runtime: tokio::runtime::Runtime,
    tx: Sender<AppMessage>,
    processes: FxHashMap<ProcessId, ProcessHandle>,
}

impl AsyncRuntime {
    pub fn new(tx: Sender<AppMessage>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .or_else(|e| {
                tracing::error!(
                    error = %e,
                    "Failed to create multi-thread tokio runtime, falling back to current-thread"
                );
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
            })?;
        Ok(Self {
            runtime,
            tx,
            processes: FxHashMap::default(),
        })
    }

    pub fn spawn_process(&mut self, process: ProcessId, command: CommandSpec, cwd: PathBuf) {
        let handle = spawn_supervised(self.runtime.handle(), process, command, cwd, self.tx.clone());
        self.processes.insert(process, handle);
    }

    /// Returns `false` when the process is unknown or its input is already closed.
    pub fn write_stdin(&self, process: ProcessId, bytes: Vec<u8>) -> bool {
        self.processes
            .get(&process)
            .is_some_and(|handle| handle.write(bytes))
    }

    pub fn terminate_process(&self, process: ProcessId) {
        if let Some(handle) = self.processes.get(&process) {
            handle.terminate();
        }
    }

    /// Forgets a process that has exited or failed to launch.
    pub fn release_process(&mut self, process: ProcessId) {
        self.processes.remove(&process);
    }

    pub fn load_dir(&self, tree: Arc<dyn ProjectTree>, path: PathBuf) {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let path_for_work = path.clone();
            let result = tokio::task::spawn_blocking(move || tree.list(&path_for_work)).await;
            let message = match result {
                Ok(Ok(entries)) => AppMessage::DirLoaded { path, entries },
                Ok(Err(e)) => AppMessage::DirLoadError {
                    path,
                    error: e.to_string(),
                },
                Err(e) => AppMessage::DirLoadError {
                    path,
                    error: e.to_string(),
                },
            };
            let _ = tx.send(message);
        });
    }

    pub fn refresh_vcs_status(&self, vcs: Arc<dyn VersionControl>) {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = tokio::task::spawn_blocking(move || vcs.status()).await;
            let message = match result {
                Ok(Ok(status)) => AppMessage::VcsStatusUpdated { status },
                Ok(Err(e)) => AppMessage::VcsStatusError {
                    error: e.to_string(),
                },
                Err(e) => AppMessage::VcsStatusError {
                    error: e.to_string(),
                },
            };
            let _ = tx.send(message);
        });
    }

    pub fn run_vcs_op(&self, vcs: Arc<dyn VersionControl>, op: VcsOp) {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let op_for_work = op.clone();
            let result = tokio::task::spawn_blocking(move || match &op_for_work {
                VcsOp::Commit { message } => vcs.commit(message),
                VcsOp::Pull => vcs.pull(),
                VcsOp::Push => vcs.push(),
            })
            .await;
            let result = match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            let _ = tx.send(AppMessage::VcsOpFinished { op, result });
        });
    }

    pub fn open_external(&self, viewer: Arc<dyn ExternalViewer>, path: PathBuf) {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let path_for_work = path.clone();
            let result = tokio::task::spawn_blocking(move || viewer.open(&path_for_work)).await;
            let error = match result {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            let _ = tx.send(AppMessage::ViewerFailed { path, error });
        });
    }

    /// Stops the runtime; supervised children are killed as their handles drop.
    pub fn shutdown(self) {
        self.runtime.shutdown_timeout(Duration::from_millis(500));
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/runtime/async_runtime.rs"]
mod tests;
