//! Per-language rule tables.
//!
//! Order matters: rules are applied in sequence and a later rule repaints whatever an earlier
//! rule classified (identifiers first, then keywords, names, literals, comments last).

use super::HighlightKind;
use crate::kernel::language::LanguageId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub pattern: String,
    pub kind: HighlightKind,
    /// Capture group painted by the rule; `0` paints the whole match.
    pub group: usize,
}

impl RuleSpec {
    pub fn new(pattern: impl Into<String>, kind: HighlightKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
            group: 0,
        }
    }

    pub fn captured(pattern: impl Into<String>, kind: HighlightKind, group: usize) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
            group,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpec {
    pub start: String,
    pub end: String,
    pub kind: HighlightKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSpec {
    pub language: LanguageId,
    pub rules: Vec<RuleSpec>,
    pub block: Option<BlockSpec>,
}

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "break", "class", "continue", "def", "del", "elif", "else", "except",
    "False", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "None",
    "nonlocal", "not", "or", "pass", "raise", "return", "True", "try", "while", "with", "yield",
    "async", "await",
];

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void",
    "volatile", "while",
];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "class", "compl", "const", "constexpr", "const_cast", "continue",
    "decltype", "default", "delete", "do", "double", "dynamic_cast", "else", "enum", "explicit",
    "export", "extern", "false", "float", "for", "friend", "goto", "if", "inline", "int", "long",
    "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr", "operator", "or",
    "or_eq", "private", "protected", "public", "register", "reinterpret_cast", "return", "short",
    "signed", "sizeof", "static", "static_assert", "static_cast", "struct", "switch", "template",
    "this", "thread_local", "throw", "true", "try", "typedef", "typeid", "typename", "union",
    "unsigned", "using", "virtual", "void", "volatile", "wchar_t", "while", "xor",
];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "instanceof", "int", "interface", "long", "native", "new",
    "package", "private", "protected", "public", "return", "short", "static", "strictfp", "super",
    "switch", "synchronized", "this", "throw", "throws", "transient", "try", "void", "volatile",
    "while",
];

const JAVASCRIPT_KEYWORDS: &[&str] = &[
    "var", "let", "const", "if", "else", "for", "while", "function", "return", "class", "this",
    "new", "import", "export", "try", "catch", "finally", "switch", "case", "break", "default",
    "await", "async", "of", "in", "null", "undefined", "true", "false",
];

const HTML_TAGS: &[&str] = &[
    "html", "head", "body", "title", "meta", "link", "script", "style", "div", "span", "p", "a",
    "img", "ul", "ol", "li", "table", "tr", "td", "th", "form", "input", "button", "select",
    "option",
];

const CSS_KEYWORDS: &[&str] = &["all", "auto", "inherit", "initial", "unset"];

const CSS_AT_RULES: &[&str] = &["@media", "@keyframes", "!important"];

const CSS_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "font-size",
    "width",
    "height",
    "margin",
    "padding",
    "border",
    "display",
    "position",
    "float",
];

const DOUBLE_QUOTED: &str = r#""[^"\\]*(\\.[^"\\]*)*""#;
const SINGLE_QUOTED: &str = r"'[^'\\]*(\\.[^'\\]*)*'";
const NUMBER: &str = r"\b\d+\.?\d*\b";
const CAPITALISED_IDENT: &str = r"\b[A-Z][a-zA-Z0-9_]*\b";

pub fn spec_for(language: LanguageId) -> LanguageSpec {
    let mut rules = Vec::new();

    if matches!(
        language,
        LanguageId::Python | LanguageId::Java | LanguageId::Cpp
    ) {
        rules.push(RuleSpec::new(CAPITALISED_IDENT, HighlightKind::Class));
    }

    match language {
        LanguageId::Python => push_keywords(&mut rules, PYTHON_KEYWORDS),
        LanguageId::C => push_keywords(&mut rules, C_KEYWORDS),
        LanguageId::Cpp => push_keywords(&mut rules, CPP_KEYWORDS),
        LanguageId::Java => push_keywords(&mut rules, JAVA_KEYWORDS),
        LanguageId::JavaScript => push_keywords(&mut rules, JAVASCRIPT_KEYWORDS),
        LanguageId::Html => push_keywords(&mut rules, HTML_TAGS),
        LanguageId::Css => {
            push_keywords(&mut rules, CSS_KEYWORDS);
            for word in CSS_AT_RULES {
                rules.push(RuleSpec::new(regex::escape(word), HighlightKind::Keyword));
            }
            for prop in CSS_PROPERTIES {
                rules.push(RuleSpec::new(
                    format!(r"\b{}\b", regex::escape(prop)),
                    HighlightKind::Function,
                ));
            }
        }
        LanguageId::Text => {}
    }

    match language {
        LanguageId::Python | LanguageId::Java | LanguageId::Cpp => {
            rules.push(RuleSpec::captured(
                r"\bclass\s+(\w+)",
                HighlightKind::Class,
                1,
            ));
            rules.push(RuleSpec::captured(
                r"\bdef\s+(\w+)",
                HighlightKind::Function,
                1,
            ));
        }
        LanguageId::JavaScript => {
            rules.push(RuleSpec::captured(
                r"\bfunction\s+(\w+)",
                HighlightKind::Function,
                1,
            ));
        }
        _ => {}
    }

    if language != LanguageId::Text {
        rules.push(RuleSpec::new(NUMBER, HighlightKind::Number));
        rules.push(RuleSpec::new(DOUBLE_QUOTED, HighlightKind::String));
        rules.push(RuleSpec::new(SINGLE_QUOTED, HighlightKind::String));
    }

    let block = match language {
        LanguageId::Python => {
            rules.push(RuleSpec::new(r"#.*", HighlightKind::Comment));
            Some(BlockSpec {
                start: r#"""""#.to_string(),
                end: r#"""""#.to_string(),
                kind: HighlightKind::String,
            })
        }
        LanguageId::C | LanguageId::Cpp | LanguageId::Java | LanguageId::JavaScript => {
            rules.push(RuleSpec::new(r"//.*", HighlightKind::Comment));
            Some(c_block_comment())
        }
        LanguageId::Css => Some(c_block_comment()),
        LanguageId::Html => Some(BlockSpec {
            start: "<!--".to_string(),
            end: "-->".to_string(),
            kind: HighlightKind::Comment,
        }),
        LanguageId::Text => None,
    };

    LanguageSpec {
        language,
        rules,
        block,
    }
}

fn c_block_comment() -> BlockSpec {
    BlockSpec {
        start: r"/\*".to_string(),
        end: r"\*/".to_string(),
        kind: HighlightKind::Comment,
    }
}

fn push_keywords(rules: &mut Vec<RuleSpec>, words: &[&str]) {
    for word in words {
        rules.push(RuleSpec::new(
            format!(r"\b{}\b", regex::escape(word)),
            HighlightKind::Keyword,
        ));
    }
}
