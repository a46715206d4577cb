//! Deterministic stand-in for the assistant: serves the IPC inbox without any model behind it.
//!
//! Completion: for a `def name(params):` header in the context, suggests the sum of the
//! parameters; `FORGEBENCH_STUB_SUGGESTION` overrides the reply. Agent: test generation
//! writes `test_<stem>.py` next to the target; refactor reports success without edits.

use forgebench::kernel::assistant::{AgentKind, AgentRequest, AgentResponse, CompletionRequest};
use forgebench::kernel::services::adapters::{load_settings, resolve_ipc_dir, AssistantPeer};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    let _logging = forgebench::logging::init("assistant_stub.log");

    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| resolve_ipc_dir(&load_settings().unwrap_or_default()));
    let Some(dir) = dir else {
        eprintln!("usage: forgebench_assistant_stub [ipc-dir]");
        std::process::exit(2);
    };
    let peer = match AssistantPeer::open(dir.clone()) {
        Ok(peer) => peer,
        Err(e) => {
            eprintln!("cannot use {}: {e}", dir.display());
            std::process::exit(1);
        }
    };
    let def_header = match Regex::new(r"def\s+\w+\s*\(([^)]*)\)") {
        Ok(re) => re,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    tracing::info!(dir = %dir.display(), "assistant stub serving");
    println!("serving {}", peer.dir().display());
    loop {
        match peer.take_completion_request() {
            Ok(Some(request)) => {
                let reply = suggest(&def_header, &request);
                tracing::info!(request_id = request.request_id, reply = %reply, "completion");
                if let Err(e) = peer.respond_completion(&reply) {
                    tracing::warn!(error = %e, "completion reply failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "bad completion request"),
        }

        match peer.take_agent_request() {
            Ok(Some(request)) => {
                let response = serve_agent(&def_header, &request);
                tracing::info!(
                    request_id = request.request_id,
                    success = response.success,
                    "agent"
                );
                if let Err(e) = peer.respond_agent(&response) {
                    tracing::warn!(error = %e, "agent reply failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "bad agent request"),
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

fn suggest(def_header: &Regex, request: &CompletionRequest) -> String {
    if let Some(fixed) = std::env::var_os("FORGEBENCH_STUB_SUGGESTION") {
        return fixed.to_string_lossy().into_owned();
    }
    let params = def_header
        .captures_iter(&request.context)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| parameter_names(m.as_str()))
        .unwrap_or_default();
    if params.is_empty() {
        "pass".to_string()
    } else {
        params.join(" + ")
    }
}

fn parameter_names(list: &str) -> Vec<String> {
    list.split(',')
        .filter_map(|param| {
            let name = param.split([':', '=']).next()?.trim();
            (!name.is_empty() && name != "self").then(|| name.to_string())
        })
        .collect()
}

fn serve_agent(def_header: &Regex, request: &AgentRequest) -> AgentResponse {
    let reply = |success: bool, message: String, files: Vec<String>| AgentResponse {
        success,
        message,
        files,
        request_id: Some(request.request_id),
    };

    let source = match std::fs::read_to_string(&request.file_path) {
        Ok(source) => source,
        Err(e) => {
            return reply(
                false,
                format!("cannot read {}: {e}", request.file_path.display()),
                Vec::new(),
            )
        }
    };

    match request.kind {
        AgentKind::Refactor => reply(
            true,
            format!("Refactor reviewed {}; no changes needed.", file_name(&request.file_path)),
            Vec::new(),
        ),
        AgentKind::TestGen => match write_tests(def_header, &request.file_path, &source) {
            Ok(path) => reply(
                true,
                format!("Generated tests in {}.", file_name(&path)),
                vec![path.display().to_string()],
            ),
            Err(e) => reply(false, format!("cannot write tests: {e}"), Vec::new()),
        },
    }
}

fn write_tests(def_header: &Regex, target: &Path, source: &str) -> std::io::Result<PathBuf> {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    let path = target.with_file_name(format!("test_{stem}.py"));

    let name_re = Regex::new(r"def\s+(\w+)").map_err(std::io::Error::other)?;
    let mut out = format!("import {stem}\n\n");
    for header in def_header.find_iter(source) {
        let Some(name) = name_re.captures(header.as_str()).and_then(|c| c.get(1)) else {
            continue;
        };
        out.push_str(&format!(
            "\ndef test_{name}():\n    assert callable({stem}.{name})\n",
            name = name.as_str()
        ));
    }
    std::fs::write(&path, out)?;
    Ok(path)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
