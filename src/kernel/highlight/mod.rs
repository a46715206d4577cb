//! Line-oriented, regex-driven highlighting.
//!
//! A line is highlighted from two inputs only: the terminal state of the previous line and the
//! text of the line itself. Documents keep the per-line terminal states so that an edit only
//! re-highlights from the edited line downwards.

pub mod rules;

use crate::kernel::error::{Result, WorkbenchError};
use crate::kernel::language::LanguageId;
use crate::kernel::theme::{Style, Theme};
use regex::Regex;
use std::ops::Range;
use std::sync::Arc;

pub use rules::{spec_for, BlockSpec, LanguageSpec, RuleSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum HighlightKind {
    #[default]
    Plain = 0,
    Keyword = 1,
    String = 2,
    Comment = 3,
    Number = 4,
    Class = 5,
    Function = 6,
}

/// Byte range within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
}

impl HighlightSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineState {
    #[default]
    Normal,
    InBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineHighlight {
    pub spans: Vec<HighlightSpan>,
    pub state: LineState,
}

#[derive(Debug)]
struct Rule {
    regex: Regex,
    kind: HighlightKind,
    group: usize,
}

#[derive(Debug)]
struct BlockRule {
    start: Regex,
    end: Regex,
    kind: HighlightKind,
}

/// Compiled rules for one language.
#[derive(Debug)]
pub struct RuleSet {
    language: LanguageId,
    rules: Vec<Rule>,
    block: Option<BlockRule>,
}

impl RuleSet {
    pub fn for_language(language: LanguageId) -> Result<Self> {
        Self::compile(&spec_for(language))
    }

    /// Compiles every pattern up front; a bad pattern is reported here and never during scans.
    pub fn compile(spec: &LanguageSpec) -> Result<Self> {
        let language = spec.language;
        let rules = spec
            .rules
            .iter()
            .map(|rule| {
                Ok(Rule {
                    regex: compile_pattern(language, &rule.pattern)?,
                    kind: rule.kind,
                    group: rule.group,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let block = match &spec.block {
            Some(block) => Some(BlockRule {
                start: compile_pattern(language, &block.start)?,
                end: compile_pattern(language, &block.end)?,
                kind: block.kind,
            }),
            None => None,
        };

        Ok(Self {
            language,
            rules,
            block,
        })
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn has_block(&self) -> bool {
        self.block.is_some()
    }

    pub fn highlight_line(&self, previous: LineState, line: &str) -> LineHighlight {
        let mut paint = vec![HighlightKind::Plain; line.len()];
        let state = self.scan(previous, line, &mut paint);
        LineHighlight {
            spans: collect_spans(&paint),
            state,
        }
    }

    /// Alternates between rule-painted code segments and block ranges until the line ends.
    fn scan(&self, previous: LineState, line: &str, paint: &mut [HighlightKind]) -> LineState {
        let Some(block) = &self.block else {
            self.paint_rules(line, 0..line.len(), paint);
            return LineState::Normal;
        };

        let mut pos = 0usize;
        if previous == LineState::InBlock {
            match block.end.find_at(line, 0) {
                Some(end) => {
                    fill(paint, 0..end.end(), block.kind);
                    pos = end.end();
                }
                None => {
                    fill(paint, 0..line.len(), block.kind);
                    return LineState::InBlock;
                }
            }
        }

        loop {
            // A line comment opened in this segment hides every later block start.
            let comment = self.line_comment_from(line, pos);
            let opener = find_block_start(&block.start, line, pos)
                .filter(|m| comment.map_or(true, |c| m.start < c));
            let Some(start) = opener else {
                self.paint_rules(line, pos..line.len(), paint);
                return LineState::Normal;
            };

            self.paint_rules(line, pos..start.start, paint);
            match block.end.find_at(line, start.end) {
                Some(end) => {
                    fill(paint, start.start..end.end(), block.kind);
                    pos = end.end();
                }
                None => {
                    fill(paint, start.start..line.len(), block.kind);
                    return LineState::InBlock;
                }
            }
        }
    }

    /// Applies every rule, in order, to `segment` only.
    fn paint_rules(&self, line: &str, segment: Range<usize>, paint: &mut [HighlightKind]) {
        if segment.is_empty() {
            return;
        }
        let haystack = &line[..segment.end];
        for rule in &self.rules {
            apply_rule(rule, haystack, segment.start, paint);
        }
    }

    fn line_comment_from(&self, line: &str, pos: usize) -> Option<usize> {
        self.rules
            .iter()
            .filter(|rule| rule.kind == HighlightKind::Comment)
            .filter_map(|rule| rule.regex.find_at(line, pos))
            .map(|m| m.start())
            .min()
    }
}

/// A rule set bound to a theme; owned by each document.
#[derive(Debug, Clone)]
pub struct Highlighter {
    rules: Arc<RuleSet>,
    theme: Theme,
}

impl Highlighter {
    pub fn new(language: LanguageId, theme: Theme) -> Result<Self> {
        Ok(Self {
            rules: Arc::new(RuleSet::for_language(language)?),
            theme,
        })
    }

    pub fn with_rules(rules: Arc<RuleSet>, theme: Theme) -> Self {
        Self { rules, theme }
    }

    pub fn language(&self) -> LanguageId {
        self.rules.language()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn highlight_line(&self, previous: LineState, line: &str) -> LineHighlight {
        self.rules.highlight_line(previous, line)
    }

    pub fn styled_line(&self, previous: LineState, line: &str) -> (Vec<(Range<usize>, Style)>, LineState) {
        let LineHighlight { spans, state } = self.highlight_line(previous, line);
        let styled = spans
            .into_iter()
            .map(|span| (span.range(), self.theme.style_for(span.kind)))
            .collect();
        (styled, state)
    }
}

fn compile_pattern(language: LanguageId, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| WorkbenchError::Configuration {
        language,
        pattern: pattern.to_string(),
        source: Box::new(source),
    })
}

struct Match {
    start: usize,
    end: usize,
}

fn find_block_start(start_pattern: &Regex, line: &str, mut at: usize) -> Option<Match> {
    while at <= line.len() {
        let m = start_pattern.find_at(line, at)?;
        if m.end() > m.start() {
            return Some(Match {
                start: m.start(),
                end: m.end(),
            });
        }
        at = next_boundary(line, m.start() + 1);
    }
    None
}

fn apply_rule(rule: &Rule, line: &str, from: usize, paint: &mut [HighlightKind]) {
    let mut at = from;
    while at <= line.len() {
        let Some(caps) = rule.regex.captures_at(line, at) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        let target = caps.get(rule.group).unwrap_or(whole);
        fill(paint, target.start()..target.end(), rule.kind);
        at = if whole.end() > whole.start() {
            whole.end()
        } else {
            next_boundary(line, whole.end() + 1)
        };
    }
}

fn next_boundary(line: &str, mut idx: usize) -> usize {
    while idx < line.len() && !line.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn fill(paint: &mut [HighlightKind], range: Range<usize>, kind: HighlightKind) {
    let end = range.end.min(paint.len());
    let start = range.start.min(end);
    for slot in &mut paint[start..end] {
        *slot = kind;
    }
}

fn collect_spans(paint: &[HighlightKind]) -> Vec<HighlightSpan> {
    let mut spans = Vec::new();
    let mut i = 0usize;
    while i < paint.len() {
        let kind = paint[i];
        let start = i;
        while i < paint.len() && paint[i] == kind {
            i += 1;
        }
        if kind != HighlightKind::Plain {
            spans.push(HighlightSpan {
                start,
                end: i,
                kind,
            });
        }
    }
    spans
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/highlight.rs"]
mod tests;
