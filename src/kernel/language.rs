use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LanguageId {
    Python,
    C,
    Cpp,
    Java,
    JavaScript,
    Html,
    Css,
    Text,
}

/// How a document of a given language gets executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    Interpreted,
    Compiled,
    Browser,
    Unsupported,
}

impl LanguageId {
    pub const ALL: [Self; 8] = [
        Self::Python,
        Self::C,
        Self::Cpp,
        Self::Java,
        Self::JavaScript,
        Self::Html,
        Self::Css,
        Self::Text,
    ];

    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        match ext.as_deref() {
            Some("py") | Some("pyw") => Self::Python,
            Some("c") | Some("h") => Self::C,
            Some("cpp") | Some("cc") | Some("cxx") | Some("hpp") | Some("hh") => Self::Cpp,
            Some("java") => Self::Java,
            Some("js") | Some("mjs") | Some("cjs") => Self::JavaScript,
            Some("html") | Some("htm") => Self::Html,
            Some("css") => Self::Css,
            _ => Self::Text,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Some(Self::Python),
            "c" => Some(Self::C),
            "c++" | "cpp" => Some(Self::Cpp),
            "java" => Some(Self::Java),
            "javascript" | "js" => Some(Self::JavaScript),
            "html" | "htm" => Some(Self::Html),
            "css" => Some(Self::Css),
            "text" | "txt" | "plain" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::C => "c",
            Self::Cpp => "c++",
            Self::Java => "java",
            Self::JavaScript => "javascript",
            Self::Html => "html",
            Self::Css => "css",
            Self::Text => "text",
        }
    }

    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::JavaScript => "js",
            Self::Html => "html",
            Self::Css => "css",
            Self::Text => "txt",
        }
    }

    pub fn execution_kind(self) -> ExecutionKind {
        match self {
            Self::Python => ExecutionKind::Interpreted,
            Self::C | Self::Cpp | Self::Java => ExecutionKind::Compiled,
            Self::Html | Self::JavaScript => ExecutionKind::Browser,
            Self::Css | Self::Text => ExecutionKind::Unsupported,
        }
    }

    /// Whether a line ending in `:` opens an indented block.
    pub fn colon_opens_block(self) -> bool {
        matches!(self, Self::Python)
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/language.rs"]
mod tests;
