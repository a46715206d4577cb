//! Line commands of the headless driver.
//!
//! A line starting with `:` is a workbench command; `::` escapes a literal leading colon;
//! anything else is input for the running program.

use super::workbench::Workbench;
use crate::kernel::error::{Result, WorkbenchError};
use crate::kernel::services::ports::ConsoleLevel;
use std::path::PathBuf;

const DEFAULT_SHOW_LINES: usize = 40;
const DEFAULT_LOG_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(PathBuf),
    New(PathBuf),
    Close,
    Save,
    Insert(String),
    Newline,
    Accept,
    Run,
    Stop,
    Refactor(Option<String>),
    Tests,
    Status,
    Commit(String),
    Pull,
    Push,
    List(Option<PathBuf>),
    Show { start: usize, end: Option<usize> },
    Theme { dark: bool },
    Logs(usize),
    Quit,
    Input(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Print(Vec<String>),
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Open(_) => "open",
            Command::New(_) => "new",
            Command::Close => "close",
            Command::Save => "save",
            Command::Insert(_) => "insert",
            Command::Newline => "newline",
            Command::Accept => "accept",
            Command::Run => "run",
            Command::Stop => "stop",
            Command::Refactor(_) => "refactor",
            Command::Tests => "tests",
            Command::Status => "status",
            Command::Commit(_) => "commit",
            Command::Pull => "pull",
            Command::Push => "push",
            Command::List(_) => "ls",
            Command::Show { .. } => "show",
            Command::Theme { .. } => "theme",
            Command::Logs(_) => "logs",
            Command::Quit => "quit",
            Command::Input(_) => "input",
        }
    }

    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let line = line.trim_end_matches(['\n', '\r']);
        if let Some(rest) = line.strip_prefix("::") {
            return Ok(Command::Input(format!(":{rest}")));
        }
        let Some(body) = line.strip_prefix(':') else {
            return Ok(Command::Input(line.to_string()));
        };

        let (name, arg) = match body.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (body, ""),
        };
        let required = |what: &str| {
            if arg.is_empty() {
                Err(format!(":{name} needs {what}"))
            } else {
                Ok(arg.to_string())
            }
        };

        let command = match name {
            "open" | "o" => Command::Open(PathBuf::from(required("a path")?)),
            "new" => Command::New(PathBuf::from(required("a path")?)),
            "close" => Command::Close,
            "save" | "w" => Command::Save,
            "insert" | "i" => Command::Insert(unescape(&required("text")?)),
            "newline" | "nl" => Command::Newline,
            "accept" | "a" => Command::Accept,
            "run" | "r" => Command::Run,
            "stop" => Command::Stop,
            "refactor" => Command::Refactor((!arg.is_empty()).then(|| arg.to_string())),
            "tests" => Command::Tests,
            "status" => Command::Status,
            "commit" => Command::Commit(required("a message")?),
            "pull" => Command::Pull,
            "push" => Command::Push,
            "ls" => Command::List((!arg.is_empty()).then(|| PathBuf::from(arg))),
            "show" => parse_show(arg)?,
            "theme" => match arg {
                "dark" => Command::Theme { dark: true },
                "light" => Command::Theme { dark: false },
                _ => return Err(":theme takes `dark` or `light`".to_string()),
            },
            "logs" => Command::Logs(parse_count(arg, DEFAULT_LOG_LINES)?),
            "quit" | "q" => Command::Quit,
            other => return Err(format!("unknown command :{other}")),
        };
        Ok(command)
    }
}

fn parse_show(arg: &str) -> std::result::Result<Command, String> {
    let mut parts = arg.split_whitespace();
    let start = match parts.next() {
        Some(raw) => parse_line_number(raw)?,
        None => 0,
    };
    let end = match parts.next() {
        Some(raw) => Some(parse_line_number(raw)? + 1),
        None => None,
    };
    Ok(Command::Show { start, end })
}

/// One-based on the command line, zero-based inside.
fn parse_line_number(raw: &str) -> std::result::Result<usize, String> {
    raw.parse::<usize>()
        .map(|n| n.saturating_sub(1))
        .map_err(|_| format!("not a line number: {raw}"))
}

fn parse_count(arg: &str, default: usize) -> std::result::Result<usize, String> {
    if arg.is_empty() {
        return Ok(default);
    }
    arg.parse::<usize>()
        .map_err(|_| format!("not a count: {arg}"))
}

/// `\n`, `\t` and `\\` escapes, so one command line can carry several source lines.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Carries out one command against the workbench.
pub fn dispatch(workbench: &mut Workbench, command: Command) -> Result<Outcome> {
    tracing::debug!(command = command.name(), "dispatch");
    match command {
        Command::Open(path) => {
            workbench.open(&path)?;
            workbench.move_cursor_to_end()?;
        }
        Command::New(path) => {
            workbench.new_file(&path)?;
        }
        Command::Close => {
            let id = workbench.focused().ok_or(WorkbenchError::NoDocument)?;
            workbench.close(id);
        }
        Command::Save => {
            workbench.save()?;
        }
        Command::Insert(text) => workbench.insert(&text)?,
        Command::Newline => workbench.newline()?,
        Command::Accept => {
            if !workbench.accept_suggestion()? {
                return Ok(Outcome::Print(vec!["no suggestion to accept".to_string()]));
            }
        }
        Command::Run => workbench.run()?,
        Command::Stop => {
            if !workbench.interrupt() {
                return Ok(Outcome::Print(vec!["nothing is running".to_string()]));
            }
        }
        Command::Refactor(instruction) => {
            workbench.request_refactor(instruction.as_deref())?;
        }
        Command::Tests => {
            workbench.request_tests()?;
        }
        Command::Status => workbench.request_vcs_status(),
        Command::Commit(message) => workbench.commit(&message),
        Command::Pull => workbench.pull(),
        Command::Push => workbench.push(),
        Command::List(path) => return Ok(Outcome::Print(list(workbench, path))),
        Command::Show { start, end } => {
            let end = end.unwrap_or(start + DEFAULT_SHOW_LINES);
            return Ok(Outcome::Print(show(workbench, start, end)?));
        }
        Command::Theme { dark } => workbench.set_theme(dark),
        Command::Logs(n) => {
            let lines = workbench.recent_logs(n).map(str::to_string).collect();
            return Ok(Outcome::Print(lines));
        }
        Command::Quit => return Ok(Outcome::Quit),
        Command::Input(line) => {
            workbench.send_input(&line);
        }
    }
    Ok(Outcome::Done)
}

fn list(workbench: &Workbench, path: Option<PathBuf>) -> Vec<String> {
    let path = match path {
        Some(path) if path.is_absolute() => path,
        Some(path) => workbench.root().join(path),
        None => workbench.root().to_path_buf(),
    };
    let lines = match workbench.project_entries(&path) {
        Some(entries) => entries
            .iter()
            .map(|entry| {
                if entry.is_dir {
                    format!("{}/", entry.name)
                } else {
                    entry.name.clone()
                }
            })
            .collect(),
        None => vec![format!("{} (loading)", path.display())],
    };
    workbench.load_dir(path);
    lines
}

fn show(workbench: &mut Workbench, start: usize, end: usize) -> Result<Vec<String>> {
    let styled = workbench.styled_lines(start..end)?;
    let Some(doc) = workbench.focused_document() else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(styled.len() + 2);
    out.push(format!(
        "{}{} [{}] line {}",
        doc.display_name(),
        if doc.is_dirty() { " *" } else { "" },
        doc.language(),
        doc.cursor_line() + 1
    ));
    for (offset, line) in styled.into_iter().enumerate() {
        out.push(format!("{:>4} {}", start + offset + 1, line));
    }
    if let Some(suggestion) = workbench.suggestion() {
        out.push(format!("     suggestion: {suggestion}"));
    }
    Ok(out)
}

/// Reports a failed command on the console; errors never end the session.
pub fn report_error(workbench: &mut Workbench, command: &str, err: &WorkbenchError) {
    tracing::warn!(command, error = %err, "command failed");
    workbench.notify(ConsoleLevel::Error, &err.to_string());
}
