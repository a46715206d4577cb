use crate::kernel::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Output surface for program output and workbench notices.
pub trait Console: Send {
    /// Program output: either one complete line including its `\n`, or the unterminated tail
    /// flushed when the process exits.
    fn write_output(&mut self, stream: ConsoleStream, text: &str);

    /// The pending, unterminated line of a running program (typically an input prompt).
    /// The same bytes are delivered again through `write_output` once the line completes.
    fn prompt(&mut self, stream: ConsoleStream, partial: &str);

    fn notify(&mut self, level: ConsoleLevel, message: &str);

    fn clear(&mut self);

    fn set_theme(&mut self, theme: &Theme);
}
