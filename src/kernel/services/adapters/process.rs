//! Child-process supervision: piped stdio, streamed output, explicit termination.
//!
//! Each supervised process reports through the runtime's `AppMessage` channel. The exit
//! message follows the output readers once they drain, or once `DRAIN_GRACE` has passed
//! since the process exited: a background grandchild holding the pipes open does not keep
//! the job running.

use super::runtime::AppMessage;
use crate::kernel::execution::{CommandSpec, ProcessId};
use crate::kernel::services::ports::ConsoleStream;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::mpsc::Sender;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const READ_CHUNK: usize = 8 * 1024;
const KILL_GRACE: Duration = Duration::from_secs(2);
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub enum ProcessControl {
    Stdin(Vec<u8>),
    Terminate,
}

#[derive(Debug, Clone)]
pub struct ProcessHandle {
    tx: UnboundedSender<ProcessControl>,
}

impl ProcessHandle {
    pub fn write(&self, bytes: Vec<u8>) -> bool {
        self.tx.send(ProcessControl::Stdin(bytes)).is_ok()
    }

    pub fn terminate(&self) -> bool {
        self.tx.send(ProcessControl::Terminate).is_ok()
    }
}

pub fn spawn_supervised(
    runtime: &tokio::runtime::Handle,
    process: ProcessId,
    command: CommandSpec,
    cwd: PathBuf,
    tx: Sender<AppMessage>,
) -> ProcessHandle {
    let (control_tx, control_rx) = tokio::sync::mpsc::unbounded_channel();
    runtime.spawn(supervise(process, command, cwd, control_rx, tx));
    ProcessHandle { tx: control_tx }
}

async fn supervise(
    process: ProcessId,
    spec: CommandSpec,
    cwd: PathBuf,
    mut control_rx: UnboundedReceiver<ProcessControl>,
    tx: Sender<AppMessage>,
) {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (k, v) in &spec.env {
        cmd.env(k, v);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(process = %process, program = %spec.program, error = %e, "spawn failed");
            let _ = tx.send(AppMessage::ProcessLaunchFailed {
                process,
                program: spec.program,
                error: e.to_string(),
            });
            return;
        }
    };

    tracing::info!(process = %process, pid = ?child.id(), command = %spec.display(), "process spawned");
    let _ = tx.send(AppMessage::ProcessSpawned {
        process,
        pid: child.id(),
    });

    let stdin_tx = child.stdin.take().map(|stdin| {
        let (in_tx, in_rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();
        tokio::spawn(writer_loop(process, stdin, in_rx));
        in_tx
    });
    let stdout_task = child
        .stdout
        .take()
        .map(|out| tokio::spawn(reader_loop(process, ConsoleStream::Stdout, out, tx.clone())));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(reader_loop(process, ConsoleStream::Stderr, err, tx.clone())));

    let mut control_open = true;
    let mut kill_deadline: Option<tokio::time::Instant> = None;
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            control = control_rx.recv(), if control_open => match control {
                Some(ProcessControl::Stdin(bytes)) => {
                    if let Some(in_tx) = &stdin_tx {
                        let _ = in_tx.send(bytes);
                    }
                }
                Some(ProcessControl::Terminate) => {
                    terminate(&mut child);
                    kill_deadline.get_or_insert(tokio::time::Instant::now() + KILL_GRACE);
                }
                None => control_open = false,
            },
            _ = sleep_until(kill_deadline), if kill_deadline.is_some() => {
                let _ = child.start_kill();
                kill_deadline = None;
            }
        }
    };
    drop(stdin_tx);

    let mut readers: Vec<_> = [stdout_task, stderr_task].into_iter().flatten().collect();
    let drained = tokio::time::timeout(DRAIN_GRACE, async {
        for task in readers.iter_mut() {
            let _ = task.await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::debug!(process = %process, "output still open after exit, readers dropped");
        for task in &readers {
            task.abort();
        }
    }

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!(process = %process, error = %e, "wait failed");
            None
        }
    };
    tracing::info!(process = %process, code = ?code, "process exited");
    let _ = tx.send(AppMessage::ProcessExited { process, code });
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        let _ = child.start_kill();
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.start_kill();
}

async fn writer_loop(
    process: ProcessId,
    mut stdin: ChildStdin,
    mut rx: UnboundedReceiver<Vec<u8>>,
) {
    while let Some(bytes) = rx.recv().await {
        if stdin.write_all(&bytes).await.is_err() {
            break;
        }
        let _ = stdin.flush().await;
    }

    tracing::debug!(process = %process, "stdin writer loop ended");
}

async fn reader_loop<R: AsyncRead + Unpin>(
    process: ProcessId,
    stream: ConsoleStream,
    mut reader: R,
    tx: Sender<AppMessage>,
) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let _ = tx.send(AppMessage::ProcessOutput {
                    process,
                    stream,
                    bytes: buf[..n].to_vec(),
                });
            }
            Err(e) => {
                tracing::debug!(process = %process, ?stream, error = %e, "output read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/services/process.rs"]
mod tests;
