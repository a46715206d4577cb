//! Compile/run lifecycle of the single execution job.
//!
//! The orchestrator is a pure state machine: it never spawns or kills anything itself. Every
//! call returns an [`ExecutionStep`] listing the effects the host must carry out (spawn a
//! process, kill one, open a file externally, delete artifacts) and the notices it should
//! surface. Process lifecycle messages are fed back in through `process_*`.

pub mod adapter;

use crate::kernel::error::{Result, WorkbenchError};
use crate::kernel::language::{ExecutionKind, LanguageId};
use crate::kernel::services::ports::{ConsoleStream, ToolchainSettings};
use std::path::{Path, PathBuf};

pub use adapter::{adapter_for, remove_artifacts, Artifact, CommandSpec, LanguageAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPhase {
    Idle,
    Saving,
    CompileQueued,
    Compiling,
    CompileFailed,
    CompileSucceeded,
    Running,
    Finished,
}

impl ExecutionPhase {
    /// A compile- or run-phase is in progress.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Saving
                | Self::CompileQueued
                | Self::Compiling
                | Self::CompileSucceeded
                | Self::Running
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::CompileFailed | Self::Finished)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u64);

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    Compile,
    Run,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEffect {
    Spawn {
        process: ProcessId,
        role: ProcessRole,
        command: CommandSpec,
        cwd: PathBuf,
    },
    Kill {
        process: ProcessId,
    },
    OpenInViewer {
        path: PathBuf,
    },
    CleanupArtifacts {
        artifacts: Vec<Artifact>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionNotice {
    Compiling { command: String },
    Started { command: String },
    CompileFailed { exit_code: Option<i32>, stderr: String },
    Finished { exit_code: Option<i32> },
    LaunchFailed { program: String, reason: String },
    OpenedExternally { path: PathBuf },
    Interrupted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStep {
    pub effects: Vec<ExecutionEffect>,
    pub notices: Vec<ExecutionNotice>,
}

impl ExecutionStep {
    fn effect(mut self, effect: ExecutionEffect) -> Self {
        self.effects.push(effect);
        self
    }

    fn notice(mut self, notice: ExecutionNotice) -> Self {
        self.notices.push(notice);
        self
    }
}

/// Where the host should send a chunk of process output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRoute {
    Console,
    Captured,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ExecutionJob {
    pub target: PathBuf,
    pub working_dir: PathBuf,
    pub language: LanguageId,
    pub compile_process: Option<ProcessId>,
    pub run_process: Option<ProcessId>,
    pub artifacts: Vec<Artifact>,
    pub compile_stderr: String,
    pub exit_code: Option<i32>,
}

/// Artifacts of an interrupted job, removed once its process is seen to exit.
#[derive(Debug, Clone)]
struct Draining {
    process: ProcessId,
    artifacts: Vec<Artifact>,
}

pub struct Orchestrator {
    toolchain: ToolchainSettings,
    phase: ExecutionPhase,
    job: Option<ExecutionJob>,
    draining: Vec<Draining>,
    next_process: u64,
}

impl Orchestrator {
    pub fn new(toolchain: ToolchainSettings) -> Self {
        Self {
            toolchain,
            phase: ExecutionPhase::Idle,
            job: None,
            draining: Vec::new(),
            next_process: 1,
        }
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    pub fn job(&self) -> Option<&ExecutionJob> {
        self.job.as_ref()
    }

    pub fn set_toolchain(&mut self, toolchain: ToolchainSettings) {
        self.toolchain = toolchain;
    }

    /// The process that currently receives console input.
    pub fn input_target(&self) -> Option<ProcessId> {
        match self.phase {
            ExecutionPhase::Running => self.job.as_ref().and_then(|job| job.run_process),
            _ => None,
        }
    }

    pub fn active_process(&self) -> Option<ProcessId> {
        if !self.phase.is_active() {
            return None;
        }
        let job = self.job.as_ref()?;
        job.run_process.or(job.compile_process)
    }

    /// Starts a job for `target`. `save` persists the document and runs before anything is
    /// spawned; its failure aborts the job.
    pub fn run<F>(&mut self, language: LanguageId, target: &Path, save: F) -> Result<ExecutionStep>
    where
        F: FnOnce() -> std::io::Result<()>,
    {
        if self.phase.is_active() {
            return Err(WorkbenchError::Busy);
        }
        let Some(adapter) = adapter_for(language, &self.toolchain) else {
            return Err(WorkbenchError::Unsupported { language });
        };

        self.phase = ExecutionPhase::Saving;
        if let Err(err) = save() {
            self.phase = ExecutionPhase::Idle;
            self.job = None;
            return Err(WorkbenchError::Unsaved {
                path: target.to_path_buf(),
                reason: err.to_string(),
            });
        }

        let working_dir = adapter::working_dir(target);
        let mut job = ExecutionJob {
            target: target.to_path_buf(),
            working_dir: working_dir.clone(),
            language,
            compile_process: None,
            run_process: None,
            artifacts: adapter.artifacts(target),
            compile_stderr: String::new(),
            exit_code: None,
        };

        let step = match adapter.kind() {
            ExecutionKind::Browser => {
                self.phase = ExecutionPhase::Finished;
                ExecutionStep::default()
                    .effect(ExecutionEffect::OpenInViewer {
                        path: target.to_path_buf(),
                    })
                    .notice(ExecutionNotice::OpenedExternally {
                        path: target.to_path_buf(),
                    })
            }
            ExecutionKind::Compiled => match adapter.compile_command(target) {
                Some(command) => {
                    let process = self.allocate_process();
                    job.compile_process = Some(process);
                    self.phase = ExecutionPhase::CompileQueued;
                    ExecutionStep::default()
                        .notice(ExecutionNotice::Compiling {
                            command: command.display(),
                        })
                        .effect(ExecutionEffect::Spawn {
                            process,
                            role: ProcessRole::Compile,
                            command,
                            cwd: working_dir,
                        })
                }
                None => self.start_run(&mut job, adapter.run_command(target)),
            },
            ExecutionKind::Interpreted => self.start_run(&mut job, adapter.run_command(target)),
            ExecutionKind::Unsupported => {
                self.phase = ExecutionPhase::Idle;
                return Err(WorkbenchError::Unsupported { language });
            }
        };

        tracing::info!(
            target = %target.display(),
            language = %language,
            phase = ?self.phase,
            "execution job started"
        );
        self.job = Some(job);
        Ok(step)
    }

    pub fn process_spawned(&mut self, process: ProcessId) {
        let is_compile = self
            .job
            .as_ref()
            .is_some_and(|job| job.compile_process == Some(process));
        if is_compile && self.phase == ExecutionPhase::CompileQueued {
            self.phase = ExecutionPhase::Compiling;
        }
    }

    pub fn process_output(
        &mut self,
        process: ProcessId,
        stream: ConsoleStream,
        bytes: &[u8],
    ) -> OutputRoute {
        let Some(job) = self.job.as_mut() else {
            return OutputRoute::Ignored;
        };
        if job.compile_process == Some(process) {
            if stream == ConsoleStream::Stderr {
                job.compile_stderr.push_str(&String::from_utf8_lossy(bytes));
                return OutputRoute::Captured;
            }
            return OutputRoute::Console;
        }
        if job.run_process == Some(process) {
            return OutputRoute::Console;
        }
        OutputRoute::Ignored
    }

    pub fn process_exited(&mut self, process: ProcessId, exit_code: Option<i32>) -> ExecutionStep {
        if let Some(idx) = self.draining.iter().position(|d| d.process == process) {
            return self.finish_draining(idx);
        }

        let Some(mut job) = self.job.take() else {
            return ExecutionStep::default();
        };

        let step = if job.compile_process == Some(process) {
            job.compile_process = None;
            if exit_code == Some(0) {
                self.phase = ExecutionPhase::CompileSucceeded;
                match adapter_for(job.language, &self.toolchain) {
                    Some(adapter) => {
                        let command = adapter.run_command(&job.target);
                        self.start_run(&mut job, command)
                    }
                    None => {
                        self.phase = ExecutionPhase::Idle;
                        ExecutionStep::default()
                    }
                }
            } else {
                self.phase = ExecutionPhase::CompileFailed;
                job.exit_code = exit_code;
                tracing::info!(exit_code = ?exit_code, "compile failed");
                let step = ExecutionStep::default().notice(ExecutionNotice::CompileFailed {
                    exit_code,
                    stderr: job.compile_stderr.clone(),
                });
                cleanup_step(step, job.artifacts.clone())
            }
        } else if job.run_process == Some(process) {
            job.run_process = None;
            job.exit_code = exit_code;
            self.phase = ExecutionPhase::Finished;
            tracing::info!(exit_code = ?exit_code, "program finished");
            let step = ExecutionStep::default().notice(ExecutionNotice::Finished { exit_code });
            cleanup_step(step, job.artifacts.clone())
        } else {
            tracing::debug!(process = %process, "exit of untracked process ignored");
            ExecutionStep::default()
        };

        self.job = Some(job);
        step
    }

    pub fn process_launch_failed(
        &mut self,
        process: ProcessId,
        program: &str,
        reason: &str,
    ) -> ExecutionStep {
        if let Some(idx) = self.draining.iter().position(|d| d.process == process) {
            return self.finish_draining(idx);
        }
        let tracked = self.job.as_ref().is_some_and(|job| {
            job.compile_process == Some(process) || job.run_process == Some(process)
        });
        if !tracked {
            return ExecutionStep::default();
        }

        let artifacts = self
            .job
            .take()
            .map(|job| job.artifacts)
            .unwrap_or_default();
        self.phase = ExecutionPhase::Idle;
        tracing::warn!(program = %program, reason = %reason, "process launch failed");
        let step = ExecutionStep::default().notice(ExecutionNotice::LaunchFailed {
            program: program.to_string(),
            reason: reason.to_string(),
        });
        cleanup_step(step, artifacts)
    }

    /// Terminates whichever process is active and returns to Idle.
    pub fn interrupt(&mut self) -> ExecutionStep {
        let Some(process) = self.active_process() else {
            return ExecutionStep::default();
        };
        let artifacts = self
            .job
            .take()
            .map(|job| job.artifacts)
            .unwrap_or_default();
        self.draining.push(Draining { process, artifacts });
        self.phase = ExecutionPhase::Idle;
        tracing::info!(process = %process, "execution interrupted");
        ExecutionStep::default()
            .effect(ExecutionEffect::Kill { process })
            .notice(ExecutionNotice::Interrupted)
    }

    /// Cleans up after an interrupted process, leaving alone any artifact that the active job
    /// in the same working directory is about to produce or run.
    fn finish_draining(&mut self, idx: usize) -> ExecutionStep {
        let drained = self.draining.remove(idx);
        let shared: &[Artifact] = match &self.job {
            Some(job) if self.phase.is_active() => &job.artifacts,
            _ => &[],
        };
        let artifacts: Vec<Artifact> = drained
            .artifacts
            .into_iter()
            .filter(|artifact| !shared.contains(artifact))
            .collect();
        if artifacts.is_empty() && !shared.is_empty() {
            tracing::debug!(process = %drained.process, "drained cleanup deferred to the active job");
        }
        cleanup_step(ExecutionStep::default(), artifacts)
    }

    fn start_run(&mut self, job: &mut ExecutionJob, command: CommandSpec) -> ExecutionStep {
        let process = self.allocate_process();
        job.run_process = Some(process);
        self.phase = ExecutionPhase::Running;
        ExecutionStep::default()
            .notice(ExecutionNotice::Started {
                command: command.display(),
            })
            .effect(ExecutionEffect::Spawn {
                process,
                role: ProcessRole::Run,
                command,
                cwd: job.working_dir.clone(),
            })
    }

    fn allocate_process(&mut self) -> ProcessId {
        let id = ProcessId(self.next_process);
        self.next_process += 1;
        id
    }
}

fn cleanup_step(step: ExecutionStep, artifacts: Vec<Artifact>) -> ExecutionStep {
    if artifacts.is_empty() {
        step
    } else {
        step.effect(ExecutionEffect::CleanupArtifacts { artifacts })
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/execution.rs"]
mod tests;
