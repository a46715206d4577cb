use super::*;
use crate::app::console::RecordingConsole;
use crate::kernel::assistant::{AgentKind, AgentResponse, TEST_GEN_REQUEST};
use crate::kernel::execution::ExecutionPhase;
use crate::kernel::services::adapters::ipc::{
    AGENT_RESPONSE_FILE, COMPLETION_REQUEST_FILE, COMPLETION_RESPONSE_FILE,
};
use crate::kernel::services::adapters::AssistantPeer;
use crate::kernel::services::ports::VcsError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

#[derive(Default)]
struct FakeVcs {
    status_calls: AtomicUsize,
    commits: Mutex<Vec<String>>,
}

impl VersionControl for FakeVcs {
    fn status(&self) -> std::result::Result<VcsStatus, VcsError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(VcsStatus {
            branch: Some("main".to_string()),
            entries: Vec::new(),
        })
    }

    fn commit(&self, message: &str) -> std::result::Result<(), VcsError> {
        self.commits
            .lock()
            .expect("commits lock")
            .push(message.to_string());
        Ok(())
    }

    fn pull(&self) -> std::result::Result<(), VcsError> {
        Err(VcsError::Command {
            command: "pull".to_string(),
            message: "no remote".to_string(),
        })
    }

    fn push(&self) -> std::result::Result<(), VcsError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingViewer {
    opened: Mutex<Vec<PathBuf>>,
}

impl ExternalViewer for RecordingViewer {
    fn open(&self, path: &Path) -> std::io::Result<()> {
        self.opened
            .lock()
            .expect("viewer lock")
            .push(path.to_path_buf());
        Ok(())
    }
}

struct Harness {
    workbench: Workbench,
    console: RecordingConsole,
    vcs: Arc<FakeVcs>,
    viewer: Arc<RecordingViewer>,
    root: TempDir,
    ipc: TempDir,
}

fn harness() -> Harness {
    harness_with(|_| {})
}

fn harness_with(configure: impl FnOnce(&mut Settings)) -> Harness {
    let root = tempfile::tempdir().expect("root tempdir");
    let ipc = tempfile::tempdir().expect("ipc tempdir");
    let mut settings = Settings {
        ipc_dir: Some(ipc.path().to_path_buf()),
        completion_poll_ms: 10,
        agent_poll_ms: 10,
        completion_debounce_ms: 0,
        ..Settings::default()
    };
    configure(&mut settings);

    let console = RecordingConsole::new();
    let vcs = Arc::new(FakeVcs::default());
    let viewer = Arc::new(RecordingViewer::default());
    let services = WorkbenchServices {
        vcs: vcs.clone(),
        tree: Arc::new(LocalProjectTree::new(root.path())),
        viewer: viewer.clone(),
    };
    let workbench =
        Workbench::with_services(root.path(), settings, Box::new(console.clone()), services)
            .expect("workbench");
    Harness {
        workbench,
        console,
        vcs,
        viewer,
        root,
        ipc,
    }
}

impl Harness {
    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.workbench.root().join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    fn peer(&self) -> AssistantPeer {
        AssistantPeer::open(self.ipc.path().to_path_buf()).expect("peer")
    }

    fn ipc_file(&self, name: &str) -> PathBuf {
        self.ipc.path().join(name)
    }

    fn drive_until(&mut self, mut done: impl FnMut(&Harness) -> bool) {
        let start = Instant::now();
        loop {
            self.workbench.tick();
            if done(self) {
                return;
            }
            if start.elapsed() > Duration::from_secs(10) {
                panic!("timeout waiting for condition");
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn text(&self) -> String {
        self.workbench
            .focused_document()
            .expect("focused document")
            .text()
    }
}

fn have(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

/// Opens `def add(a, b):` and types the start of the body, cursor at the end of the line.
fn type_return_line(h: &mut Harness) -> PathBuf {
    let path = h.write("calc.py", "def add(a, b):\n");
    h.workbench.open(&path).expect("open");
    h.workbench.move_cursor_to_end().expect("cursor");
    h.workbench.insert("    return ").expect("insert");
    path
}

#[test]
fn open_focuses_and_close_moves_focus_to_the_last_tab() {
    let mut h = harness();
    let a = h.write("a.py", "x = 1\n");
    let b = h.write("b.c", "int x;\n");

    let a_id = h.workbench.open(&a).expect("open a");
    let b_id = h.workbench.open(&b).expect("open b");
    assert_eq!(h.workbench.focused(), Some(b_id));
    assert_eq!(h.workbench.open(Path::new("a.py")).expect("reopen"), a_id);
    assert_eq!(h.workbench.focused(), Some(a_id));
    assert_eq!(h.workbench.documents().count(), 2);

    assert!(h.workbench.close(a_id));
    assert_eq!(h.workbench.focused(), Some(b_id));
    assert!(!h.workbench.close(a_id));
    assert!(h.workbench.close(b_id));
    assert_eq!(h.workbench.focused(), None);
    assert!(matches!(
        h.workbench.insert("x"),
        Err(WorkbenchError::NoDocument)
    ));
}

#[test]
fn new_file_is_bound_to_its_path_and_saved_on_demand() {
    let mut h = harness();
    let id = h.workbench.new_file(Path::new("fresh.py")).expect("new");
    let doc = h.workbench.document(id).expect("doc");
    assert_eq!(doc.language(), LanguageId::Python);
    assert_eq!(doc.text(), "");

    h.workbench.insert("print(1)\n").expect("insert");
    let path = h.workbench.save().expect("save");
    assert_eq!(std::fs::read_to_string(&path).expect("read"), "print(1)\n");
    assert!(h.console.has_notice(ConsoleLevel::Info, "Saved fresh.py"));
}

#[test]
fn save_refreshes_repository_status() {
    let mut h = harness();
    let path = h.write("a.py", "x = 1\n");
    h.workbench.open(&path).expect("open");
    h.drive_until(|h| h.workbench.vcs_status().is_some());
    let before = h.vcs.status_calls.load(Ordering::SeqCst);

    h.workbench.save().expect("save");
    h.drive_until(|h| h.vcs.status_calls.load(Ordering::SeqCst) > before);
}

#[test]
fn project_root_is_listed_on_start() {
    let mut h = harness();
    std::fs::create_dir(h.root.path().join("pkg")).expect("mkdir");
    h.write("main.py", "");
    h.workbench.load_dir(h.workbench.root().to_path_buf());
    h.drive_until(|h| {
        h.workbench
            .project_entries(h.workbench.root())
            .is_some_and(|entries| entries.len() == 2)
    });
    let entries = h
        .workbench
        .project_entries(h.workbench.root())
        .expect("entries");
    assert_eq!(entries[0].name, "pkg");
    assert!(entries[0].is_dir);
    assert_eq!(entries[1].name, "main.py");
}

#[test]
fn completion_request_is_written_after_the_debounce() {
    let mut h = harness();
    let path = type_return_line(&mut h);

    h.drive_until(|h| h.ipc_file(COMPLETION_REQUEST_FILE).exists());
    let request = h
        .peer()
        .take_completion_request()
        .expect("read")
        .expect("request");
    assert_eq!(request.file_path, path);
    assert_eq!(request.context, "def add(a, b):\n    return ");
}

#[test]
fn second_request_does_not_overwrite_the_one_in_flight() {
    let mut h = harness();
    type_return_line(&mut h);
    h.drive_until(|h| h.ipc_file(COMPLETION_REQUEST_FILE).exists());
    let first = std::fs::read(h.ipc_file(COMPLETION_REQUEST_FILE)).expect("first");

    h.workbench.insert("a ").expect("insert");
    for _ in 0..20 {
        h.workbench.tick();
        std::thread::sleep(Duration::from_millis(2));
    }
    let still = std::fs::read(h.ipc_file(COMPLETION_REQUEST_FILE)).expect("still");
    assert_eq!(first, still);
}

#[test]
fn suggestion_is_shown_only_while_the_cursor_stays_at_line_end() {
    let mut h = harness();
    type_return_line(&mut h);
    h.drive_until(|h| h.ipc_file(COMPLETION_REQUEST_FILE).exists());
    let peer = h.peer();
    peer.take_completion_request().expect("read").expect("request");
    peer.respond_completion("a + b\nignored second line\n")
        .expect("respond");

    h.drive_until(|h| h.workbench.suggestion().is_some());
    assert_eq!(h.workbench.suggestion(), Some("a + b"));
    assert!(!h.ipc_file(COMPLETION_RESPONSE_FILE).exists());

    h.workbench.set_cursor(0).expect("cursor");
    assert_eq!(h.workbench.suggestion(), None);
    assert!(!h.workbench.accept_suggestion().expect("accept"));
}

#[test]
fn accepted_suggestion_is_inserted_at_the_cursor() {
    let mut h = harness();
    type_return_line(&mut h);
    h.drive_until(|h| h.ipc_file(COMPLETION_REQUEST_FILE).exists());
    let peer = h.peer();
    peer.take_completion_request().expect("read").expect("request");
    peer.respond_completion("a + b").expect("respond");
    h.drive_until(|h| h.workbench.suggestion().is_some());

    assert!(h.workbench.accept_suggestion().expect("accept"));
    assert_eq!(h.text(), "def add(a, b):\n    return a + b");
    assert_eq!(h.workbench.suggestion(), None);
}

#[test]
fn suggestion_for_a_moved_cursor_is_dropped_silently() {
    let mut h = harness();
    type_return_line(&mut h);
    h.drive_until(|h| h.ipc_file(COMPLETION_REQUEST_FILE).exists());
    let peer = h.peer();
    peer.take_completion_request().expect("read").expect("request");

    h.workbench.set_cursor(2).expect("cursor");
    peer.respond_completion("a + b").expect("respond");
    h.drive_until(|h| !h.ipc_file(COMPLETION_RESPONSE_FILE).exists());

    assert_eq!(h.workbench.suggestion(), None);
    h.workbench.move_cursor_to_end().expect("cursor");
    assert_eq!(h.workbench.suggestion(), None);
}

#[test]
fn error_sentinels_are_not_offered() {
    let mut h = harness();
    type_return_line(&mut h);
    h.drive_until(|h| h.ipc_file(COMPLETION_REQUEST_FILE).exists());
    let peer = h.peer();
    peer.take_completion_request().expect("read").expect("request");
    peer.respond_completion("# AI Error").expect("respond");

    h.drive_until(|h| !h.ipc_file(COMPLETION_RESPONSE_FILE).exists());
    assert_eq!(h.workbench.suggestion(), None);
}

#[test]
fn agent_request_saves_first_and_success_refreshes_the_project() {
    let mut h = harness();
    let path = h.write("calc.py", "def add(a, b):\n    return a + b\n");
    h.workbench.open(&path).expect("open");
    h.workbench.move_cursor_to_end().expect("cursor");
    h.workbench.insert("# edited\n").expect("insert");

    let id = h.workbench.request_tests().expect("request");
    assert!(std::fs::read_to_string(&path)
        .expect("read")
        .ends_with("# edited\n"));

    let peer = h.peer();
    let request = peer.take_agent_request().expect("read").expect("request");
    assert_eq!(request.kind, AgentKind::TestGen);
    assert_eq!(request.request, TEST_GEN_REQUEST);
    assert_eq!(request.request_id, id);
    assert_eq!(request.file_path, path);

    h.drive_until(|h| h.workbench.vcs_status().is_some());
    let before = h.vcs.status_calls.load(Ordering::SeqCst);
    peer.respond_agent(&AgentResponse {
        success: true,
        message: "Generated tests.".to_string(),
        files: vec!["test_calc.py".to_string()],
        request_id: Some(id),
    })
    .expect("respond");

    h.drive_until(|h| h.console.has_notice(ConsoleLevel::Success, "Generated tests."));
    assert_eq!(h.workbench.ipc().and_then(|ipc| ipc.outstanding_agent()), None);
    h.drive_until(|h| h.vcs.status_calls.load(Ordering::SeqCst) > before);
}

#[test]
fn agent_failure_is_reported_verbatim() {
    let mut h = harness();
    let path = h.write("calc.py", "x = 1\n");
    h.workbench.open(&path).expect("open");
    let id = h.workbench.request_refactor(None).expect("request");

    h.peer()
        .respond_agent(&AgentResponse {
            success: false,
            message: "quota exceeded".to_string(),
            files: Vec::new(),
            request_id: Some(id),
        })
        .expect("respond");
    h.drive_until(|h| h.console.has_notice(ConsoleLevel::Error, "quota exceeded"));
}

#[test]
fn stale_agent_response_is_discarded() {
    let mut h = harness();
    let path = h.write("calc.py", "x = 1\n");
    h.workbench.open(&path).expect("open");
    let id = h.workbench.request_refactor(Some("rename x")).expect("request");

    h.peer()
        .respond_agent(&AgentResponse {
            success: true,
            message: "old news".to_string(),
            files: Vec::new(),
            request_id: Some(id + 100),
        })
        .expect("respond");
    h.drive_until(|h| !h.ipc_file(AGENT_RESPONSE_FILE).exists());

    assert!(!h.console.has_notice(ConsoleLevel::Success, "old news"));
    assert_eq!(
        h.workbench.ipc().and_then(|ipc| ipc.outstanding_agent()),
        Some(id)
    );
}

#[test]
fn malformed_agent_response_is_removed_and_reported() {
    let mut h = harness();
    std::fs::write(h.ipc_file(AGENT_RESPONSE_FILE), "{ not json").expect("write");
    h.drive_until(|h| !h.ipc_file(AGENT_RESPONSE_FILE).exists());
    h.drive_until(|h| h.console.has_notice(ConsoleLevel::Warning, "malformed"));
}

#[test]
fn agent_request_without_a_document_is_rejected() {
    let mut h = harness();
    assert!(matches!(
        h.workbench.request_tests(),
        Err(WorkbenchError::NoDocument)
    ));
}

#[test]
fn leftover_exchange_files_are_cleared_on_start_and_on_shutdown() {
    let ipc = tempfile::tempdir().expect("ipc");
    std::fs::write(ipc.path().join(COMPLETION_REQUEST_FILE), "{}").expect("write");
    let dir = ipc.path().to_path_buf();
    let h = harness_with(|settings| settings.ipc_dir = Some(dir.clone()));
    assert!(!ipc.path().join(COMPLETION_REQUEST_FILE).exists());

    std::fs::write(ipc.path().join(COMPLETION_RESPONSE_FILE), "late").expect("write");
    h.workbench.shutdown();
    assert!(!ipc.path().join(COMPLETION_RESPONSE_FILE).exists());
}

#[test]
fn external_edit_replaces_buffer_and_clamps_cursor() {
    let mut h = harness();
    let path = h.write("notes.txt", "original content here\n");
    h.workbench.open(&path).expect("open");
    h.workbench.move_cursor_to_end().expect("cursor");
    h.workbench.insert("unsaved").expect("insert");

    std::fs::write(&path, "X").expect("external write");
    assert!(h.workbench.reload_if_changed(&path).expect("reload"));

    let doc = h.workbench.focused_document().expect("doc");
    assert_eq!(doc.text(), "X");
    assert!(!doc.is_dirty());
    assert_eq!(doc.cursor(), 1);
    assert!(h.console.has_notice(ConsoleLevel::Info, "notes.txt changed on disk"));

    assert!(!h.workbench.reload_if_changed(&path).expect("no-op"));
}

#[test]
fn unreadable_change_is_skipped_with_a_watcher_error() {
    let mut h = harness();
    let path = h.write("data.txt", "text\n");
    h.workbench.open(&path).expect("open");

    std::fs::write(&path, [0xff, 0xfe, 0x00]).expect("write bytes");
    let err = h.workbench.reload_if_changed(&path).expect_err("not utf-8");
    assert!(matches!(err, WorkbenchError::WatcherRead { .. }));
    assert_eq!(h.text(), "text\n");

    std::fs::write(&path, "fixed\n").expect("write");
    assert!(h.workbench.reload_if_changed(&path).expect("retry"));
    assert_eq!(h.text(), "fixed\n");
}

#[test]
fn theme_switch_reaches_documents_and_console() {
    let mut h = harness();
    let path = h.write("a.py", "def f():\n");
    h.workbench.open(&path).expect("open");

    h.workbench.set_theme(false);
    assert!(!h.workbench.theme().dark);
    assert_eq!(h.console.snapshot().dark, Some(false));
    let doc = h.workbench.focused_document().expect("doc");
    assert!(!doc.highlighter().theme().dark);

    let lines = h.workbench.styled_lines(0..1).expect("styled");
    let keyword = Theme::light().style_for(crate::kernel::HighlightKind::Keyword).ansi();
    assert!(lines[0].starts_with(&keyword));
    assert!(lines[0].contains("def"));
}

#[test]
fn browser_languages_go_to_the_external_viewer() {
    let mut h = harness();
    let path = h.write("index.html", "<p>hi</p>\n");
    h.workbench.open(&path).expect("open");
    h.workbench.run().expect("run");
    assert_eq!(h.workbench.phase(), ExecutionPhase::Finished);

    h.drive_until(|h| !h.viewer.opened.lock().expect("lock").is_empty());
    assert_eq!(h.viewer.opened.lock().expect("lock")[0], path);
}

#[test]
fn unsupported_language_is_rejected_without_state_change() {
    let mut h = harness();
    let path = h.write("style.css", "p { color: red; }\n");
    h.workbench.open(&path).expect("open");
    assert!(matches!(
        h.workbench.run(),
        Err(WorkbenchError::Unsupported { .. })
    ));
    assert_eq!(h.workbench.phase(), ExecutionPhase::Idle);
}

#[test]
fn input_without_a_running_program_is_reported() {
    let mut h = harness();
    assert!(!h.workbench.send_input("hello"));
    assert!(h.console.has_notice(ConsoleLevel::Warning, "no program is running"));
}

#[test]
fn vcs_operations_report_their_outcome() {
    let mut h = harness();
    h.workbench.commit("first");
    h.drive_until(|h| h.console.has_notice(ConsoleLevel::Success, "git commit finished"));
    assert_eq!(
        h.vcs.commits.lock().expect("lock").as_slice(),
        ["first".to_string()]
    );

    h.workbench.pull();
    h.drive_until(|h| h.console.has_notice(ConsoleLevel::Error, "no remote"));

    h.workbench.request_vcs_status();
    h.drive_until(|h| h.console.has_notice(ConsoleLevel::Info, "main | clean"));
}

#[test]
fn missing_interpreter_is_a_launch_error_and_returns_to_idle() {
    let mut h = harness_with(|settings| {
        settings.toolchain.python = "forgebench-no-such-interpreter".to_string();
    });
    let path = h.write("main.py", "print('hi')\n");
    h.workbench.open(&path).expect("open");
    h.workbench.run().expect("run");

    h.drive_until(|h| h.console.has_notice(ConsoleLevel::Error, "failed to start"));
    assert_eq!(h.workbench.phase(), ExecutionPhase::Idle);
}

#[test]
fn interpreted_program_prompts_and_reads_console_input() {
    if !have("python3") {
        eprintln!("skipping: python3 not available");
        return;
    }
    let mut h = harness();
    let path = h.write("greet.py", "name = input('Name: ')\nprint('hello ' + name)\n");
    h.workbench.open(&path).expect("open");
    h.workbench.run().expect("run");

    h.drive_until(|h| {
        h.console
            .snapshot()
            .prompts
            .iter()
            .any(|(_, partial)| partial == "Name: ")
    });
    assert!(h.workbench.send_input("bob"));
    h.drive_until(|h| h.workbench.phase() == ExecutionPhase::Finished);

    assert_eq!(h.console.stdout(), "Name: hello bob\n");
    assert!(h.console.has_notice(ConsoleLevel::Success, "exit code 0"));
}

#[test]
fn second_run_is_busy_and_interrupt_returns_to_idle() {
    if !have("python3") {
        eprintln!("skipping: python3 not available");
        return;
    }
    let mut h = harness();
    let path = h.write("slow.py", "import time\ntime.sleep(30)\n");
    h.workbench.open(&path).expect("open");
    h.workbench.run().expect("run");
    assert_eq!(h.workbench.phase(), ExecutionPhase::Running);

    assert!(matches!(h.workbench.run(), Err(WorkbenchError::Busy)));
    assert_eq!(h.workbench.phase(), ExecutionPhase::Running);

    assert!(h.workbench.interrupt());
    assert_eq!(h.workbench.phase(), ExecutionPhase::Idle);
    assert!(h.console.has_notice(ConsoleLevel::Warning, "interrupted"));
    assert!(!h.workbench.interrupt());
}
