use super::Workbench;
use crate::kernel::services::adapters::AppMessage;
use crate::kernel::services::ports::ConsoleLevel;
use std::sync::mpsc;
use std::time::Instant;

impl Workbench {
    /// Drains background messages and runs every timer-driven check. Called by the host loop;
    /// returns whether anything observable changed.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;
        changed |= self.poll_runtime();
        changed |= self.poll_logs();
        changed |= self.poll_file_watcher();
        changed |= self.poll_completion_debounce();
        changed |= self.poll_completion_response();
        changed |= self.poll_agent_response();
        changed
    }

    fn poll_runtime(&mut self) -> bool {
        let mut changed = false;
        for _ in 0..super::MAX_MESSAGE_DRAIN_PER_TICK {
            match self.rx.try_recv() {
                Ok(msg) => {
                    self.handle_message(msg);
                    changed = true;
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    tracing::error!("runtime message channel disconnected");
                    break;
                }
            }
        }
        changed
    }

    fn poll_logs(&mut self) -> bool {
        let Some(rx) = self.log_rx.take() else {
            return false;
        };

        let mut changed = false;
        let mut disconnected = false;
        for _ in 0..super::MAX_LOG_DRAIN_PER_TICK {
            match rx.try_recv() {
                Ok(line) => {
                    changed = true;
                    self.logs.push_back(line);
                    while self.logs.len() > super::LOG_BUFFER_CAP {
                        self.logs.pop_front();
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if !disconnected {
            self.log_rx = Some(rx);
        }
        changed
    }

    pub fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::ProcessSpawned { process, pid } => {
                self.handle_process_spawned(process, pid);
            }
            AppMessage::ProcessOutput {
                process,
                stream,
                bytes,
            } => {
                self.handle_process_output(process, stream, &bytes);
            }
            AppMessage::ProcessExited { process, code } => {
                self.handle_process_exited(process, code);
            }
            AppMessage::ProcessLaunchFailed {
                process,
                program,
                error,
            } => {
                self.handle_process_launch_failed(process, &program, &error);
            }
            AppMessage::DirLoaded { path, entries } => {
                tracing::debug!(path = %path.display(), entries = entries.len(), "dir loaded");
                self.project_entries.insert(path, entries);
            }
            AppMessage::DirLoadError { path, error } => {
                tracing::warn!(path = %path.display(), error = %error, "load_dir failed");
                self.project_entries.remove(&path);
            }
            AppMessage::VcsStatusUpdated { status } => {
                if std::mem::take(&mut self.vcs_status_requested) {
                    self.console.notify(ConsoleLevel::Info, &status.summary());
                    for entry in &status.entries {
                        self.console.notify(
                            ConsoleLevel::Info,
                            &format!(
                                "  {} {}",
                                entry
                                    .status
                                    .primary_kind()
                                    .map(|kind| kind.marker())
                                    .unwrap_or(' '),
                                entry.path.display()
                            ),
                        );
                    }
                }
                self.vcs_status = Some(status);
            }
            AppMessage::VcsStatusError { error } => {
                tracing::debug!(error = %error, "vcs status unavailable");
                self.vcs_status = None;
                if std::mem::take(&mut self.vcs_status_requested) {
                    self.console.notify(ConsoleLevel::Warning, &error);
                }
            }
            AppMessage::VcsOpFinished { op, result } => match result {
                Ok(()) => {
                    tracing::info!(op = op.name(), "vcs operation finished");
                    self.console
                        .notify(ConsoleLevel::Success, &format!("git {} finished", op.name()));
                    self.refresh_vcs_status();
                }
                Err(error) => {
                    tracing::warn!(op = op.name(), error = %error, "vcs operation failed");
                    self.console.notify(ConsoleLevel::Error, &error);
                }
            },
            AppMessage::ViewerFailed { path, error } => {
                tracing::warn!(path = %path.display(), error = %error, "external viewer failed");
                self.console.notify(
                    ConsoleLevel::Error,
                    &format!("cannot open {}: {error}", path.display()),
                );
            }
        }
    }

    fn poll_completion_debounce(&mut self) -> bool {
        let Some(deadline) = self.pending_completion_deadline else {
            return false;
        };
        if Instant::now() < deadline {
            return false;
        }
        self.pending_completion_deadline = None;
        self.request_completion()
    }

    fn poll_completion_response(&mut self) -> bool {
        let period = self.settings.completion_poll();
        if self.ipc.is_none() || !Self::poll_due(&mut self.next_completion_poll, period, Instant::now())
        {
            return false;
        }
        self.take_completion_response()
    }

    fn poll_agent_response(&mut self) -> bool {
        let period = self.settings.agent_poll();
        if self.ipc.is_none() || !Self::poll_due(&mut self.next_agent_poll, period, Instant::now()) {
            return false;
        }
        self.take_agent_response()
    }
}
