//! Per-language compile/run commands.

use crate::kernel::language::{ExecutionKind, LanguageId};
use crate::kernel::services::ports::ToolchainSettings;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[cfg(windows)]
pub const NATIVE_ARTIFACT: &str = "temp_output.exe";
#[cfg(not(windows))]
pub const NATIVE_ARTIFACT: &str = "temp_output";

/// A program invocation; the working directory is owned by the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Something a compile step leaves behind in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    File(PathBuf),
    /// Every file with this extension directly inside `dir`.
    Extension { dir: PathBuf, extension: String },
}

impl Artifact {
    /// Deletes whatever currently matches; returns the paths that were removed.
    pub fn remove(&self) -> Vec<PathBuf> {
        match self {
            Self::File(path) => match std::fs::remove_file(path) {
                Ok(()) => vec![path.clone()],
                Err(_) => Vec::new(),
            },
            Self::Extension { dir, extension } => {
                let Ok(entries) = std::fs::read_dir(dir) else {
                    return Vec::new();
                };
                entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.is_file()
                            && path.extension().and_then(|e| e.to_str()) == Some(extension.as_str())
                    })
                    .filter(|path| std::fs::remove_file(path).is_ok())
                    .collect()
            }
        }
    }
}

pub fn remove_artifacts(artifacts: &[Artifact]) -> Vec<PathBuf> {
    artifacts.iter().flat_map(Artifact::remove).collect()
}

pub trait LanguageAdapter: Send + Sync {
    fn kind(&self) -> ExecutionKind;

    /// `None` for languages that run straight from source.
    fn compile_command(&self, target: &Path) -> Option<CommandSpec>;

    fn run_command(&self, target: &Path) -> CommandSpec;

    fn artifacts(&self, target: &Path) -> Vec<Artifact>;
}

pub fn adapter_for(
    language: LanguageId,
    toolchain: &ToolchainSettings,
) -> Option<Box<dyn LanguageAdapter>> {
    match language {
        LanguageId::Python => Some(Box::new(PythonAdapter {
            interpreter: toolchain.python.clone(),
        })),
        LanguageId::C => Some(Box::new(NativeAdapter {
            compiler: toolchain.c_compiler.clone(),
        })),
        LanguageId::Cpp => Some(Box::new(NativeAdapter {
            compiler: toolchain.cpp_compiler.clone(),
        })),
        LanguageId::Java => Some(Box::new(JavaAdapter {
            compiler: toolchain.java_compiler.clone(),
            runtime: toolchain.java_runtime.clone(),
        })),
        LanguageId::Html | LanguageId::JavaScript => Some(Box::new(BrowserAdapter)),
        LanguageId::Css | LanguageId::Text => None,
    }
}

fn file_name(target: &Path) -> String {
    target
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| target.to_string_lossy().to_string())
}

pub fn working_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

struct PythonAdapter {
    interpreter: String,
}

impl LanguageAdapter for PythonAdapter {
    fn kind(&self) -> ExecutionKind {
        ExecutionKind::Interpreted
    }

    fn compile_command(&self, _target: &Path) -> Option<CommandSpec> {
        None
    }

    fn run_command(&self, target: &Path) -> CommandSpec {
        CommandSpec::new(&self.interpreter)
            .arg(file_name(target))
            .env("PYTHONUNBUFFERED", "1")
    }

    fn artifacts(&self, _target: &Path) -> Vec<Artifact> {
        Vec::new()
    }
}

/// gcc / g++: one fixed output binary next to the source.
struct NativeAdapter {
    compiler: String,
}

impl LanguageAdapter for NativeAdapter {
    fn kind(&self) -> ExecutionKind {
        ExecutionKind::Compiled
    }

    fn compile_command(&self, target: &Path) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(&self.compiler)
                .arg(file_name(target))
                .arg("-o")
                .arg(NATIVE_ARTIFACT),
        )
    }

    fn run_command(&self, target: &Path) -> CommandSpec {
        let binary = working_dir(target).join(NATIVE_ARTIFACT);
        CommandSpec::new(binary.to_string_lossy())
    }

    fn artifacts(&self, target: &Path) -> Vec<Artifact> {
        vec![Artifact::File(working_dir(target).join(NATIVE_ARTIFACT))]
    }
}

struct JavaAdapter {
    compiler: String,
    runtime: String,
}

impl LanguageAdapter for JavaAdapter {
    fn kind(&self) -> ExecutionKind {
        ExecutionKind::Compiled
    }

    fn compile_command(&self, target: &Path) -> Option<CommandSpec> {
        Some(CommandSpec::new(&self.compiler).arg(file_name(target)))
    }

    fn run_command(&self, target: &Path) -> CommandSpec {
        let source = std::fs::read_to_string(target).unwrap_or_default();
        let class = java_main_class(&source).unwrap_or_else(|| {
            target
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "Main".to_string())
        });
        CommandSpec::new(&self.runtime).arg(class)
    }

    fn artifacts(&self, target: &Path) -> Vec<Artifact> {
        vec![Artifact::Extension {
            dir: working_dir(target),
            extension: "class".to_string(),
        }]
    }
}

fn java_main_class(source: &str) -> Option<String> {
    static PUBLIC_CLASS: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = PUBLIC_CLASS
        .get_or_init(|| Regex::new(r"public\s+class\s+(\w+)").ok())
        .as_ref()?;
    regex
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// HTML / JavaScript are handed to the external viewer; no process is tracked.
struct BrowserAdapter;

impl LanguageAdapter for BrowserAdapter {
    fn kind(&self) -> ExecutionKind {
        ExecutionKind::Browser
    }

    fn compile_command(&self, _target: &Path) -> Option<CommandSpec> {
        None
    }

    fn run_command(&self, target: &Path) -> CommandSpec {
        CommandSpec::new(target.to_string_lossy())
    }

    fn artifacts(&self, _target: &Path) -> Vec<Artifact> {
        Vec::new()
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/execution_adapter.rs"]
mod tests;
