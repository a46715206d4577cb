use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Exchange directory shared with the assistant; `None` means `~/.forgebench_ipc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipc_dir: Option<PathBuf>,
    #[serde(default = "default_completion_poll_ms")]
    pub completion_poll_ms: u64,
    #[serde(default = "default_agent_poll_ms")]
    pub agent_poll_ms: u64,
    #[serde(default = "default_completion_debounce_ms")]
    pub completion_debounce_ms: u64,
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    #[serde(default = "default_dark_mode")]
    pub dark_mode: bool,
    #[serde(default)]
    pub toolchain: ToolchainSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ipc_dir: None,
            completion_poll_ms: default_completion_poll_ms(),
            agent_poll_ms: default_agent_poll_ms(),
            completion_debounce_ms: default_completion_debounce_ms(),
            context_lines: default_context_lines(),
            dark_mode: default_dark_mode(),
            toolchain: ToolchainSettings::default(),
        }
    }
}

impl Settings {
    pub fn completion_poll(&self) -> Duration {
        Duration::from_millis(self.completion_poll_ms.max(1))
    }

    pub fn agent_poll(&self) -> Duration {
        Duration::from_millis(self.agent_poll_ms.max(1))
    }

    pub fn completion_debounce(&self) -> Duration {
        Duration::from_millis(self.completion_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainSettings {
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_c_compiler")]
    pub c_compiler: String,
    #[serde(default = "default_cpp_compiler")]
    pub cpp_compiler: String,
    #[serde(default = "default_java_compiler")]
    pub java_compiler: String,
    #[serde(default = "default_java_runtime")]
    pub java_runtime: String,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            python: default_python(),
            c_compiler: default_c_compiler(),
            cpp_compiler: default_cpp_compiler(),
            java_compiler: default_java_compiler(),
            java_runtime: default_java_runtime(),
        }
    }
}

fn default_completion_poll_ms() -> u64 {
    100
}

fn default_agent_poll_ms() -> u64 {
    500
}

fn default_completion_debounce_ms() -> u64 {
    400
}

fn default_context_lines() -> usize {
    5
}

fn default_dark_mode() -> bool {
    true
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_c_compiler() -> String {
    "gcc".to_string()
}

fn default_cpp_compiler() -> String {
    "g++".to_string()
}

fn default_java_compiler() -> String {
    "javac".to_string()
}

fn default_java_runtime() -> String {
    "java".to_string()
}
