//! Tracing setup shared by both binaries.
//!
//! Every event goes to a daily-rolling file and is also forwarded line by line over a channel,
//! which the workbench drains into the backlog shown by `:logs`.

use crate::app::console::LineBuffer;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter directives, checked before `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "FORGEBENCH_LOG";
const DEFAULT_DIRECTIVE: &str = "forgebench=info";

pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_rx: Option<Receiver<String>>,
}

impl LoggingGuard {
    pub fn take_log_rx(&mut self) -> Option<Receiver<String>> {
        self.log_rx.take()
    }
}

#[derive(Clone)]
struct BacklogMakeWriter {
    file: NonBlocking,
    tx: Sender<String>,
}

/// One writer per event: the file gets the bytes as they come, the channel gets whole lines.
struct BacklogWriter {
    file: NonBlocking,
    lines: LineBuffer,
    tx: Sender<String>,
}

impl BacklogWriter {
    fn send(&self, line: &str) {
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.is_empty() {
            let _ = self.tx.send(line.to_string());
        }
    }
}

impl<'a> MakeWriter<'a> for BacklogMakeWriter {
    type Writer = BacklogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BacklogWriter {
            file: self.file.make_writer(),
            lines: LineBuffer::new(),
            tx: self.tx.clone(),
        }
    }
}

impl Write for BacklogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        for line in self.lines.push(&buf[..n]) {
            self.send(&line);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for BacklogWriter {
    fn drop(&mut self) {
        if let Some(rest) = self.lines.finish() {
            self.send(&rest);
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn log_dir() -> Option<PathBuf> {
    crate::kernel::services::adapters::ensure_log_dir()
        .or_else(|_| -> io::Result<PathBuf> {
            let dir = std::env::temp_dir().join("forgebench").join("logs");
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        })
        .ok()
}

/// Installs the global subscriber, writing to `<log dir>/<file_name>.<date>`.
///
/// Returns `None` when no log directory can be created or a subscriber is already set.
pub fn init(file_name: &str) -> Option<LoggingGuard> {
    let log_dir = log_dir()?;
    let (file, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, file_name));
    let (tx, log_rx) = mpsc::channel::<String>();

    let subscriber = tracing_subscriber::registry().with(env_filter()).with(
        tracing_subscriber::fmt::layer()
            .with_writer(BacklogMakeWriter { file, tx })
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true),
    );
    if subscriber.try_init().is_err() {
        return None;
    }

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(panic = %panic_info, location = %location, "panic");
        default_hook(panic_info);
    }));

    tracing::info!(
        log_dir = %log_dir.display(),
        file = file_name,
        version = env!("CARGO_PKG_VERSION"),
        "logging started"
    );

    Some(LoggingGuard {
        _guard: guard,
        log_rx: Some(log_rx),
    })
}
