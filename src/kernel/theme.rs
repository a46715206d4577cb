//! Colour theme handed to the highlighter and the console.
//!
//! There are no module-level colour constants in use at render time: every consumer gets a
//! `Theme` value when it is built and again whenever the user switches themes.

use crate::kernel::highlight::HighlightKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Self(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// Parses `#RRGGBB` / `RRGGBB`.
    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Self::from_hex)
    }

    pub fn ansi_fg(self) -> String {
        format!("\x1b[38;2;{};{};{}m", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub fg: Rgb,
    pub bold: bool,
    pub italic: bool,
}

impl Style {
    pub fn ansi(self) -> String {
        let mut out = self.fg.ansi_fg();
        if self.bold {
            out.push_str("\x1b[1m");
        }
        if self.italic {
            out.push_str("\x1b[3m");
        }
        out
    }
}

pub const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub dark: bool,
    pub background: Rgb,
    pub foreground: Rgb,
    pub keyword: Rgb,
    pub string: Rgb,
    pub comment: Rgb,
    pub number: Rgb,
    pub class: Rgb,
    pub function: Rgb,
    pub console_error: Rgb,
    pub console_success: Rgb,
    pub console_muted: Rgb,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            dark: true,
            background: Rgb::from_hex(0x1E1E1E),
            foreground: Rgb::from_hex(0xD4D4D4),
            keyword: Rgb::from_hex(0x569CD6),
            string: Rgb::from_hex(0xCE9178),
            comment: Rgb::from_hex(0x6A9955),
            number: Rgb::from_hex(0xB5CEA8),
            class: Rgb::from_hex(0x4EC9B0),
            function: Rgb::from_hex(0xDCDCAA),
            console_error: Rgb::from_hex(0xF14C4C),
            console_success: Rgb::from_hex(0x23D18B),
            console_muted: Rgb::from_hex(0x808080),
        }
    }

    pub fn light() -> Self {
        Self {
            dark: false,
            background: Rgb::from_hex(0xFFFFFF),
            foreground: Rgb::from_hex(0x1F1F1F),
            keyword: Rgb::from_hex(0x0000FF),
            string: Rgb::from_hex(0xA31515),
            comment: Rgb::from_hex(0x008000),
            number: Rgb::from_hex(0x098658),
            class: Rgb::from_hex(0x267F99),
            function: Rgb::from_hex(0x795E26),
            console_error: Rgb::from_hex(0xCD3131),
            console_success: Rgb::from_hex(0x00BC00),
            console_muted: Rgb::from_hex(0x6E6E6E),
        }
    }

    pub fn for_mode(dark: bool) -> Self {
        if dark {
            Self::dark()
        } else {
            Self::light()
        }
    }

    pub fn style_for(&self, kind: HighlightKind) -> Style {
        let (fg, bold, italic) = match kind {
            HighlightKind::Keyword => (self.keyword, true, false),
            HighlightKind::String => (self.string, false, false),
            HighlightKind::Comment => (self.comment, false, true),
            HighlightKind::Number => (self.number, false, false),
            HighlightKind::Class => (self.class, false, false),
            HighlightKind::Function => (self.function, false, false),
            HighlightKind::Plain => (self.foreground, false, false),
        };
        Style { fg, bold, italic }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
