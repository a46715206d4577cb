use super::Workbench;
use crate::app::console::LineBuffer;
use crate::kernel::error::{Result, WorkbenchError};
use crate::kernel::execution::{
    remove_artifacts, ExecutionEffect, ExecutionNotice, ExecutionPhase, ExecutionStep,
    OutputRoute, ProcessId,
};
use crate::kernel::services::ports::{ConsoleLevel, ConsoleStream};

impl Workbench {
    pub fn phase(&self) -> ExecutionPhase {
        self.orchestrator.phase()
    }

    /// Saves and runs the focused document.
    pub fn run(&mut self) -> Result<()> {
        if self.orchestrator.phase().is_active() {
            return Err(WorkbenchError::Busy);
        }
        let id = self.focus.ok_or(WorkbenchError::NoDocument)?;
        let Some(doc) = self.documents.get_mut(id) else {
            return Err(WorkbenchError::NoDocument);
        };
        let Some(target) = doc.path().map(|p| p.to_path_buf()) else {
            return Err(WorkbenchError::Unsaved {
                path: doc.display_name().into(),
                reason: "the buffer has no file path".to_string(),
            });
        };
        let language = doc.language();

        let step = self
            .orchestrator
            .run(language, &target, || doc.save().map(|_| ()))?;
        self.acknowledge_write(&target);

        self.output_buffers.clear();
        self.console.clear();
        self.apply_step(step);
        Ok(())
    }

    /// Terminates the active compile or run process, if any.
    pub fn interrupt(&mut self) -> bool {
        let step = self.orchestrator.interrupt();
        let interrupted = !step.effects.is_empty();
        self.apply_step(step);
        interrupted
    }

    /// Forwards one line of console input to the running program.
    pub fn send_input(&mut self, line: &str) -> bool {
        let Some(process) = self.orchestrator.input_target() else {
            self.console
                .notify(ConsoleLevel::Warning, "no program is running; input discarded");
            return false;
        };
        let mut bytes = line.as_bytes().to_vec();
        if !line.ends_with('\n') {
            bytes.push(b'\n');
        }
        if self.runtime.write_stdin(process, bytes) {
            true
        } else {
            self.console
                .notify(ConsoleLevel::Warning, "the program no longer accepts input");
            false
        }
    }

    pub(super) fn handle_process_spawned(&mut self, process: ProcessId, pid: Option<u32>) {
        tracing::debug!(process = %process, pid = ?pid, "process spawned");
        self.orchestrator.process_spawned(process);
    }

    pub(super) fn handle_process_output(
        &mut self,
        process: ProcessId,
        stream: ConsoleStream,
        bytes: &[u8],
    ) {
        if self.orchestrator.process_output(process, stream, bytes) != OutputRoute::Console {
            return;
        }
        let buffer = self.output_buffers.entry((process, stream)).or_default();
        let lines = buffer.push(bytes);
        let partial = buffer.partial();
        for line in &lines {
            self.console.write_output(stream, line);
        }
        if let Some(partial) = partial {
            self.console.prompt(stream, &partial);
        }
    }

    pub(super) fn handle_process_exited(&mut self, process: ProcessId, code: Option<i32>) {
        for stream in [ConsoleStream::Stdout, ConsoleStream::Stderr] {
            if let Some(rest) = self
                .output_buffers
                .remove(&(process, stream))
                .and_then(|mut buffer: LineBuffer| buffer.finish())
            {
                self.console.write_output(stream, &rest);
            }
        }
        self.runtime.release_process(process);
        let step = self.orchestrator.process_exited(process, code);
        self.apply_step(step);
    }

    pub(super) fn handle_process_launch_failed(
        &mut self,
        process: ProcessId,
        program: &str,
        error: &str,
    ) {
        self.output_buffers.retain(|(p, _), _| *p != process);
        self.runtime.release_process(process);
        let step = self.orchestrator.process_launch_failed(process, program, error);
        self.apply_step(step);
    }

    pub(super) fn apply_step(&mut self, step: ExecutionStep) {
        let ExecutionStep { effects, notices } = step;
        for notice in notices {
            self.report(notice);
        }
        for effect in effects {
            match effect {
                ExecutionEffect::Spawn {
                    process,
                    role,
                    command,
                    cwd,
                } => {
                    tracing::info!(
                        process = %process,
                        role = ?role,
                        command = %command.display(),
                        cwd = %cwd.display(),
                        "spawning"
                    );
                    self.runtime.spawn_process(process, command, cwd);
                }
                ExecutionEffect::Kill { process } => {
                    self.runtime.terminate_process(process);
                }
                ExecutionEffect::OpenInViewer { path } => {
                    self.runtime.open_external(self.services.viewer.clone(), path);
                }
                ExecutionEffect::CleanupArtifacts { artifacts } => {
                    let removed = remove_artifacts(&artifacts);
                    if !removed.is_empty() {
                        tracing::debug!(count = removed.len(), "artifacts removed");
                    }
                }
            }
        }
    }

    fn report(&mut self, notice: ExecutionNotice) {
        match notice {
            ExecutionNotice::Compiling { command } => {
                self.console
                    .notify(ConsoleLevel::Info, &format!("Compiling: {command}"));
            }
            ExecutionNotice::Started { command } => {
                self.console
                    .notify(ConsoleLevel::Info, &format!("Running: {command}"));
            }
            ExecutionNotice::CompileFailed { exit_code, stderr } => {
                if !stderr.is_empty() {
                    self.console.write_output(ConsoleStream::Stderr, &stderr);
                }
                let err = WorkbenchError::Compile { exit_code, stderr };
                self.console.notify(ConsoleLevel::Error, &err.to_string());
            }
            ExecutionNotice::Finished { exit_code } => {
                let (level, code) = match exit_code {
                    Some(0) => (ConsoleLevel::Success, "0".to_string()),
                    Some(code) => (ConsoleLevel::Warning, code.to_string()),
                    None => (ConsoleLevel::Warning, "none (terminated by signal)".to_string()),
                };
                self.console
                    .notify(level, &format!("Process finished with exit code {code}"));
            }
            ExecutionNotice::LaunchFailed { program, reason } => {
                let err = WorkbenchError::ProcessLaunch { program, reason };
                self.console.notify(ConsoleLevel::Error, &err.to_string());
            }
            ExecutionNotice::OpenedExternally { path } => {
                self.console.notify(
                    ConsoleLevel::Info,
                    &format!("Opened {} in the external viewer", path.display()),
                );
            }
            ExecutionNotice::Interrupted => {
                self.console
                    .notify(ConsoleLevel::Warning, "Execution interrupted");
            }
        }
    }
}
