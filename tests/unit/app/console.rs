use super::*;

#[test]
fn line_buffer_splits_complete_lines_and_keeps_the_tail() {
    let mut buffer = LineBuffer::new();
    assert_eq!(buffer.push(b"one\ntw"), vec!["one\n".to_string()]);
    assert_eq!(buffer.partial().as_deref(), Some("tw"));

    assert_eq!(
        buffer.push(b"o\nthree\n"),
        vec!["two\n".to_string(), "three\n".to_string()]
    );
    assert!(buffer.is_empty());
    assert_eq!(buffer.partial(), None);
}

#[test]
fn line_buffer_finish_flushes_the_prompt() {
    let mut buffer = LineBuffer::new();
    assert!(buffer.push(b"Enter name: ").is_empty());
    assert_eq!(buffer.finish().as_deref(), Some("Enter name: "));
    assert_eq!(buffer.finish(), None);
}

#[test]
fn line_buffer_joins_a_multibyte_char_split_across_chunks() {
    let mut buffer = LineBuffer::new();
    let bytes = "é\n".as_bytes();
    assert!(buffer.push(&bytes[..1]).is_empty());
    assert_eq!(buffer.push(&bytes[1..]), vec!["é\n".to_string()]);
}

#[test]
fn recording_console_shares_its_record_between_clones() {
    let console = RecordingConsole::new();
    let mut boxed: Box<dyn Console> = Box::new(console.clone());

    boxed.write_output(ConsoleStream::Stdout, "hi\n");
    boxed.write_output(ConsoleStream::Stderr, "oops\n");
    boxed.prompt(ConsoleStream::Stdout, "> ");
    boxed.notify(ConsoleLevel::Warning, "careful");
    boxed.set_theme(&Theme::light());

    let record = console.snapshot();
    assert_eq!(record.stdout, "hi\n");
    assert_eq!(record.stderr, "oops\n");
    assert_eq!(record.prompts, vec![(ConsoleStream::Stdout, "> ".to_string())]);
    assert!(console.has_notice(ConsoleLevel::Warning, "care"));
    assert!(!console.has_notice(ConsoleLevel::Error, "care"));
    assert_eq!(record.dark, Some(false));

    boxed.clear();
    let record = console.snapshot();
    assert!(record.stdout.is_empty());
    assert_eq!(record.clears, 1);
    assert_eq!(record.notices.len(), 1);
}
