use super::*;
use crate::kernel::language::LanguageId;
use crate::kernel::theme::Theme;

fn doc_at_end(path: Option<&str>, content: &str) -> Document {
    let mut doc = Document::new(
        path.map(PathBuf::from),
        LanguageId::Python,
        content,
        Theme::dark(),
    )
    .expect("document");
    doc.move_cursor_to_end();
    doc
}

#[test]
fn trigger_heuristic_follows_line_endings_and_length() {
    assert!(line_wants_completion("    return "));
    assert!(line_wants_completion("obj."));
    assert!(line_wants_completion("f("));
    assert!(line_wants_completion("x ="));
    assert!(line_wants_completion("a:"));
    assert!(line_wants_completion("xs["));
    assert!(line_wants_completion("prin"));
    assert!(!line_wants_completion("pri"));
    assert!(!line_wants_completion(""));
}

#[test]
fn completion_request_carries_context_and_id() {
    let doc = doc_at_end(Some("/p/m.py"), "def add(a, b):\n    return ");
    let request = completion_request(&doc, 5, 7).expect("request");
    assert_eq!(request.file_path, PathBuf::from("/p/m.py"));
    assert_eq!(request.context, "def add(a, b):\n    return ");
    assert_eq!(request.request_id, 7);
}

#[test]
fn completion_request_needs_a_path_and_cursor_at_line_end() {
    let untitled = doc_at_end(None, "    return ");
    assert!(completion_request(&untitled, 5, 1).is_none());

    let mut mid = doc_at_end(Some("/p/m.py"), "    return ");
    mid.set_cursor(2);
    assert!(completion_request(&mid, 5, 1).is_none());
}

#[test]
fn suggestion_keeps_only_the_first_line_and_drops_sentinels() {
    assert_eq!(
        suggestion_from_response("a + b\nsecond\n"),
        Some("a + b".to_string())
    );
    assert_eq!(suggestion_from_response("# AI Error"), None);
    assert_eq!(suggestion_from_response("  # Gemini not configured \n"), None);
    assert_eq!(suggestion_from_response(" \n "), None);
}

#[test]
fn pending_suggestion_goes_stale_when_the_cursor_moves() {
    let mut doc = doc_at_end(Some("/p/m.py"), "def add(a, b):\n    return ");
    let pending = PendingSuggestion::new(&doc, "a + b".to_string());
    assert!(pending.still_valid_for(&doc));

    doc.insert("x");
    assert!(!pending.still_valid_for(&doc));
}

#[test]
fn agent_payloads_use_the_wire_names() {
    let request = AgentRequest {
        kind: AgentKind::TestGen,
        file_path: PathBuf::from("/p/m.py"),
        request: TEST_GEN_REQUEST.to_string(),
        request_id: 3,
    };
    let json: serde_json::Value = serde_json::to_value(&request).expect("serialize");
    assert_eq!(json["type"], "test_gen");
    assert_eq!(json["request_id"], 3);

    let response: AgentResponse =
        serde_json::from_str(r#"{"success": true}"#).expect("deserialize");
    assert_eq!(response.message, "No message provided.");
    assert!(response.files.is_empty());
    assert!(response.answers(Some(3)));
}

#[test]
fn agent_response_for_another_request_is_stale() {
    let response = AgentResponse {
        success: true,
        message: "done".to_string(),
        files: vec![],
        request_id: Some(2),
    };
    assert!(response.answers(Some(2)));
    assert!(!response.answers(Some(3)));
    assert!(!response.answers(None));
}
