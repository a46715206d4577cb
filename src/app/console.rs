//! Console implementations: ANSI stdout for the headless binary, a recorder for tests.

use crate::kernel::services::ports::{Console, ConsoleLevel, ConsoleStream};
use crate::kernel::theme::{Rgb, Theme, ANSI_RESET};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Splits a byte stream into complete lines, holding back the unterminated tail.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line completed by them, each ending in `\n`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0usize;
        while let Some(offset) = memchr::memchr(b'\n', &self.pending[start..]) {
            let end = start + offset + 1;
            lines.push(String::from_utf8_lossy(&self.pending[start..end]).into_owned());
            start = end;
        }
        self.pending.drain(..start);
        lines
    }

    /// The unterminated tail, if any.
    pub fn partial(&self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }

    /// Takes the unterminated tail; used once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.partial();
        self.pending.clear();
        rest
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Writes program output and notices to the process's own stdout.
pub struct StdoutConsole {
    out: io::Stdout,
    theme: Theme,
    color: bool,
    prompt_shown: bool,
}

impl StdoutConsole {
    pub fn new(theme: Theme) -> Self {
        Self {
            out: io::stdout(),
            theme,
            color: std::env::var_os("NO_COLOR").is_none(),
            prompt_shown: false,
        }
    }

    fn paint(&self, color: Rgb, text: &str) -> String {
        if self.color {
            format!("{}{}{}", color.ansi_fg(), text, ANSI_RESET)
        } else {
            text.to_string()
        }
    }

    fn level_color(&self, level: ConsoleLevel) -> Rgb {
        match level {
            ConsoleLevel::Info => self.theme.console_muted,
            ConsoleLevel::Success => self.theme.console_success,
            ConsoleLevel::Warning => self.theme.function,
            ConsoleLevel::Error => self.theme.console_error,
        }
    }

    /// Moves past a prompt that is still on screen before printing something else.
    fn end_prompt(&mut self) {
        if self.prompt_shown {
            let _ = self.out.write_all(b"\r\x1b[2K");
            self.prompt_shown = false;
        }
    }

    fn emit(&mut self, text: &str) {
        let mut out = self.out.lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

impl Console for StdoutConsole {
    fn write_output(&mut self, stream: ConsoleStream, text: &str) {
        self.end_prompt();
        let text = match stream {
            ConsoleStream::Stdout => text.to_string(),
            ConsoleStream::Stderr => self.paint(self.theme.console_error, text),
        };
        self.emit(&text);
    }

    fn prompt(&mut self, stream: ConsoleStream, partial: &str) {
        self.end_prompt();
        let text = match stream {
            ConsoleStream::Stdout => partial.to_string(),
            ConsoleStream::Stderr => self.paint(self.theme.console_error, partial),
        };
        self.emit(&text);
        self.prompt_shown = true;
    }

    fn notify(&mut self, level: ConsoleLevel, message: &str) {
        self.end_prompt();
        let line = self.paint(self.level_color(level), &format!("[{}] {}", level_tag(level), message));
        self.emit(&format!("{line}\n"));
    }

    fn clear(&mut self) {
        self.end_prompt();
        let rule = self.paint(self.theme.console_muted, &"-".repeat(40));
        self.emit(&format!("{rule}\n"));
    }

    fn set_theme(&mut self, theme: &Theme) {
        self.theme = theme.clone();
    }
}

fn level_tag(level: ConsoleLevel) -> &'static str {
    match level {
        ConsoleLevel::Info => "info",
        ConsoleLevel::Success => "ok",
        ConsoleLevel::Warning => "warn",
        ConsoleLevel::Error => "error",
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConsoleRecord {
    pub stdout: String,
    pub stderr: String,
    pub prompts: Vec<(ConsoleStream, String)>,
    pub notices: Vec<(ConsoleLevel, String)>,
    pub clears: usize,
    pub dark: Option<bool>,
}

/// Records everything it is given; clones share one record.
#[derive(Debug, Default, Clone)]
pub struct RecordingConsole {
    record: Arc<Mutex<ConsoleRecord>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ConsoleRecord {
        self.record
            .lock()
            .map(|record| record.clone())
            .unwrap_or_default()
    }

    pub fn stdout(&self) -> String {
        self.snapshot().stdout
    }

    pub fn stderr(&self) -> String {
        self.snapshot().stderr
    }

    pub fn has_notice(&self, level: ConsoleLevel, needle: &str) -> bool {
        self.snapshot()
            .notices
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }

    fn with(&self, f: impl FnOnce(&mut ConsoleRecord)) {
        if let Ok(mut record) = self.record.lock() {
            f(&mut record);
        }
    }
}

impl Console for RecordingConsole {
    fn write_output(&mut self, stream: ConsoleStream, text: &str) {
        self.with(|record| match stream {
            ConsoleStream::Stdout => record.stdout.push_str(text),
            ConsoleStream::Stderr => record.stderr.push_str(text),
        });
    }

    fn prompt(&mut self, stream: ConsoleStream, partial: &str) {
        self.with(|record| record.prompts.push((stream, partial.to_string())));
    }

    fn notify(&mut self, level: ConsoleLevel, message: &str) {
        self.with(|record| record.notices.push((level, message.to_string())));
    }

    fn clear(&mut self) {
        self.with(|record| {
            record.stdout.clear();
            record.stderr.clear();
            record.prompts.clear();
            record.clears += 1;
        });
    }

    fn set_theme(&mut self, theme: &Theme) {
        self.with(|record| record.dark = Some(theme.dark));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/app/console.rs"]
mod tests;
