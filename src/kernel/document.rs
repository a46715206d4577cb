//! Open, editable buffers bound to a path and a language.

use crate::kernel::error::Result;
use crate::kernel::highlight::{Highlighter, LineHighlight, LineState};
use crate::kernel::language::LanguageId;
use crate::kernel::theme::Theme;
use ropey::Rope;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

slotmap::new_key_type! {
    pub struct DocumentId;
}

#[derive(Debug, Clone)]
pub struct Document {
    path: Option<PathBuf>,
    language: LanguageId,
    text: Rope,
    saved_text: Option<String>,
    dirty: bool,
    cursor: usize,
    scroll_line: usize,
    highlighter: Highlighter,
    line_states: Vec<LineState>,
}

impl Document {
    pub fn new(
        path: Option<PathBuf>,
        language: LanguageId,
        content: &str,
        theme: Theme,
    ) -> Result<Self> {
        let highlighter = Highlighter::new(language, theme)?;
        Ok(Self {
            path,
            language,
            text: Rope::from_str(content),
            saved_text: None,
            dirty: false,
            cursor: 0,
            scroll_line: 0,
            highlighter,
            line_states: Vec::new(),
        })
    }

    pub fn open(path: &Path, theme: Theme) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut doc = Self::new(
            Some(path.to_path_buf()),
            LanguageId::from_path(path),
            &content,
            theme,
        )?;
        doc.saved_text = Some(content);
        Ok(doc)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string())
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn rope(&self) -> &Rope {
        &self.text
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll_line(&self) -> usize {
        self.scroll_line
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    pub fn set_cursor(&mut self, char_idx: usize) {
        self.cursor = char_idx.min(self.text.len_chars());
    }

    pub fn set_scroll_line(&mut self, line: usize) {
        self.scroll_line = line.min(self.line_count().saturating_sub(1));
    }

    pub fn move_cursor_to_end(&mut self) {
        self.cursor = self.text.len_chars();
    }

    pub fn cursor_line(&self) -> usize {
        self.text.char_to_line(self.cursor.min(self.text.len_chars()))
    }

    pub fn line_text(&self, line: usize) -> String {
        if line >= self.line_count() {
            return String::new();
        }
        let mut text = self.text.line(line).to_string();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        text
    }

    pub fn current_line(&self) -> String {
        self.line_text(self.cursor_line())
    }

    pub fn cursor_at_line_end(&self) -> bool {
        let line = self.cursor_line();
        let line_start = self.text.line_to_char(line);
        let line_len = self.line_text(line).chars().count();
        self.cursor == line_start + line_len
    }

    /// Up to `max_lines` lines before the cursor line, followed by the cursor line itself.
    pub fn completion_context(&self, max_lines: usize) -> String {
        let line = self.cursor_line();
        let first = line.saturating_sub(max_lines);
        let mut context = String::new();
        for idx in first..line {
            context.push_str(&self.line_text(idx));
            context.push('\n');
        }
        context.push_str(&self.current_line());
        context
    }

    pub fn insert(&mut self, text: &str) {
        let at = self.cursor;
        self.insert_at(at, text);
    }

    pub fn insert_at(&mut self, char_idx: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let at = char_idx.min(self.text.len_chars());
        self.invalidate_from_char(at);
        self.text.insert(at, text);
        let inserted = text.chars().count();
        if self.cursor >= at {
            self.cursor += inserted;
        }
        self.dirty = true;
    }

    pub fn delete(&mut self, range: Range<usize>) {
        let len = self.text.len_chars();
        let start = range.start.min(len);
        let end = range.end.min(len);
        if start >= end {
            return;
        }
        self.invalidate_from_char(start);
        self.text.remove(start..end);
        if self.cursor >= end {
            self.cursor -= end - start;
        } else if self.cursor > start {
            self.cursor = start;
        }
        self.dirty = true;
    }

    /// Replaces the buffer with content that is known to be on disk.
    ///
    /// Cursor and scroll position are kept where they were, clamped to the new text.
    pub fn reload_from_disk(&mut self, content: &str) {
        let cursor = self.cursor;
        let scroll = self.scroll_line;
        self.text = Rope::from_str(content);
        self.line_states.clear();
        self.saved_text = Some(content.to_string());
        self.dirty = false;
        self.set_cursor(cursor);
        self.set_scroll_line(scroll);
    }

    pub fn matches_saved(&self, content: &str) -> bool {
        self.saved_text.as_deref() == Some(content)
    }

    pub fn save(&mut self) -> std::io::Result<PathBuf> {
        let path = self.path.clone().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "document has no file path")
        })?;
        write_rope_to_path(&path, &self.text)?;
        self.saved_text = Some(self.text.to_string());
        self.dirty = false;
        Ok(path)
    }

    /// Binds the document to a new path and re-derives the language from it.
    pub fn save_as(&mut self, path: PathBuf) -> Result<PathBuf> {
        let language = LanguageId::from_path(&path);
        if language != self.language {
            self.set_language(language)?;
        }
        self.path = Some(path);
        Ok(self.save()?)
    }

    pub fn set_language(&mut self, language: LanguageId) -> Result<()> {
        self.highlighter = Highlighter::new(language, self.highlighter.theme().clone())?;
        self.language = language;
        self.line_states.clear();
        Ok(())
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.highlighter.set_theme(theme);
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    /// Highlights one line, reusing cached terminal states of the lines above it.
    pub fn highlight_line(&mut self, line: usize) -> LineHighlight {
        if line >= self.line_count() {
            return LineHighlight::default();
        }
        let previous = self.state_before(line);
        let out = self.highlighter.highlight_line(previous, &self.line_text(line));
        if self.line_states.len() == line {
            self.line_states.push(out.state);
        }
        out
    }

    pub fn highlight_lines(&mut self, lines: Range<usize>) -> Vec<LineHighlight> {
        let end = lines.end.min(self.line_count());
        (lines.start.min(end)..end)
            .map(|line| self.highlight_line(line))
            .collect()
    }

    /// Number of lines whose terminal state is currently cached.
    pub fn cached_states(&self) -> usize {
        self.line_states.len()
    }

    fn state_before(&mut self, line: usize) -> LineState {
        while self.line_states.len() < line {
            let idx = self.line_states.len();
            let previous = idx
                .checked_sub(1)
                .and_then(|i| self.line_states.get(i).copied())
                .unwrap_or_default();
            let state = self
                .highlighter
                .highlight_line(previous, &self.line_text(idx))
                .state;
            self.line_states.push(state);
        }
        line.checked_sub(1)
            .and_then(|i| self.line_states.get(i).copied())
            .unwrap_or_default()
    }

    fn invalidate_from_char(&mut self, char_idx: usize) {
        let line = self.text.char_to_line(char_idx.min(self.text.len_chars()));
        self.line_states.truncate(line);
    }
}

fn write_rope_to_path(path: &Path, rope: &Rope) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    for chunk in rope.chunks() {
        writer.write_all(chunk.as_bytes())?;
    }
    writer.flush()
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/document.rs"]
mod tests;
