use super::*;

fn orchestrator() -> Orchestrator {
    Orchestrator::new(ToolchainSettings::default())
}

fn saved() -> std::io::Result<()> {
    Ok(())
}

fn spawned(step: &ExecutionStep) -> Vec<(ProcessId, ProcessRole, CommandSpec)> {
    step.effects
        .iter()
        .filter_map(|effect| match effect {
            ExecutionEffect::Spawn {
                process,
                role,
                command,
                ..
            } => Some((*process, *role, command.clone())),
            _ => None,
        })
        .collect()
}

fn cleanups(step: &ExecutionStep) -> Vec<Artifact> {
    step.effects
        .iter()
        .filter_map(|effect| match effect {
            ExecutionEffect::CleanupArtifacts { artifacts } => Some(artifacts.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

#[test]
fn interpreted_job_runs_immediately_and_finishes() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::Python, Path::new("/w/main.py"), saved)
        .expect("run");

    let spawns = spawned(&step);
    assert_eq!(spawns.len(), 1);
    let (process, role, command) = &spawns[0];
    assert_eq!(*role, ProcessRole::Run);
    assert_eq!(command.program, "python3");
    assert_eq!(command.args, vec!["main.py".to_string()]);
    assert!(command
        .env
        .contains(&("PYTHONUNBUFFERED".to_string(), "1".to_string())));
    assert_eq!(orch.phase(), ExecutionPhase::Running);
    assert_eq!(orch.input_target(), Some(*process));

    let done = orch.process_exited(*process, Some(0));
    assert_eq!(orch.phase(), ExecutionPhase::Finished);
    assert_eq!(
        done.notices,
        vec![ExecutionNotice::Finished { exit_code: Some(0) }]
    );
    assert_eq!(orch.job().and_then(|job| job.exit_code), Some(0));
    assert_eq!(orch.input_target(), None);
}

#[test]
fn run_while_active_is_rejected_without_state_change() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::C, Path::new("/w/main.c"), saved)
        .expect("run");
    let (compile, _, _) = spawned(&step)[0].clone();
    orch.process_spawned(compile);
    assert_eq!(orch.phase(), ExecutionPhase::Compiling);

    let mut save_called = false;
    let err = orch
        .run(LanguageId::Python, Path::new("/w/other.py"), || {
            save_called = true;
            Ok(())
        })
        .expect_err("busy");
    assert!(matches!(err, WorkbenchError::Busy));
    assert!(!save_called);
    assert_eq!(orch.phase(), ExecutionPhase::Compiling);
    assert_eq!(orch.job().map(|job| job.language), Some(LanguageId::C));
}

#[test]
fn run_is_legal_again_after_terminal_phases() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::C, Path::new("/w/bad.c"), saved)
        .expect("run");
    let (compile, _, _) = spawned(&step)[0].clone();
    orch.process_exited(compile, Some(1));
    assert_eq!(orch.phase(), ExecutionPhase::CompileFailed);

    let step = orch
        .run(LanguageId::Python, Path::new("/w/ok.py"), saved)
        .expect("run after compile failure");
    let (run, _, _) = spawned(&step)[0].clone();
    orch.process_exited(run, Some(0));
    assert_eq!(orch.phase(), ExecutionPhase::Finished);

    orch.run(LanguageId::Python, Path::new("/w/ok.py"), saved)
        .expect("run after finish");
}

#[test]
fn compiled_job_spawns_the_artifact_only_after_a_clean_compile() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::C, Path::new("/w/main.c"), saved)
        .expect("run");
    let spawns = spawned(&step);
    assert_eq!(spawns.len(), 1);
    let (compile, role, command) = spawns[0].clone();
    assert_eq!(role, ProcessRole::Compile);
    assert_eq!(command.program, "gcc");
    assert_eq!(orch.phase(), ExecutionPhase::CompileQueued);

    orch.process_spawned(compile);
    assert_eq!(
        orch.process_output(compile, ConsoleStream::Stderr, b"warning\n"),
        OutputRoute::Captured
    );

    let next = orch.process_exited(compile, Some(0));
    let spawns = spawned(&next);
    assert_eq!(spawns.len(), 1);
    let (run, role, command) = spawns[0].clone();
    assert_eq!(role, ProcessRole::Run);
    assert!(command.program.ends_with(adapter::NATIVE_ARTIFACT));
    assert_eq!(orch.phase(), ExecutionPhase::Running);
    assert!(cleanups(&next).is_empty());

    let done = orch.process_exited(run, Some(0));
    assert_eq!(orch.phase(), ExecutionPhase::Finished);
    assert_eq!(
        cleanups(&done),
        vec![Artifact::File(
            Path::new("/w").join(adapter::NATIVE_ARTIFACT)
        )]
    );
}

#[test]
fn failed_compile_is_terminal_and_surfaces_stderr() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::Cpp, Path::new("/w/bad.cpp"), saved)
        .expect("run");
    let (compile, _, command) = spawned(&step)[0].clone();
    assert_eq!(command.program, "g++");
    orch.process_spawned(compile);
    orch.process_output(compile, ConsoleStream::Stderr, b"bad.cpp:1: error\n");

    let step = orch.process_exited(compile, Some(1));
    assert!(spawned(&step).is_empty());
    assert_eq!(orch.phase(), ExecutionPhase::CompileFailed);
    assert_eq!(
        step.notices,
        vec![ExecutionNotice::CompileFailed {
            exit_code: Some(1),
            stderr: "bad.cpp:1: error\n".to_string(),
        }]
    );
}

#[test]
fn save_failure_aborts_before_anything_spawns() {
    let mut orch = orchestrator();
    let err = orch
        .run(LanguageId::Python, Path::new("/w/main.py"), || {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            ))
        })
        .expect_err("unsaved");
    assert!(matches!(err, WorkbenchError::Unsaved { .. }));
    assert_eq!(orch.phase(), ExecutionPhase::Idle);
    assert!(orch.job().is_none());
}

#[test]
fn unsupported_languages_are_rejected_without_saving() {
    let mut orch = orchestrator();
    for language in [LanguageId::Css, LanguageId::Text] {
        let mut save_called = false;
        let err = orch
            .run(language, Path::new("/w/a.css"), || {
                save_called = true;
                Ok(())
            })
            .expect_err("unsupported");
        assert!(matches!(err, WorkbenchError::Unsupported { .. }));
        assert!(!save_called);
        assert_eq!(orch.phase(), ExecutionPhase::Idle);
    }
}

#[test]
fn browser_languages_finish_after_handing_off_to_the_viewer() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::Html, Path::new("/w/index.html"), saved)
        .expect("run");
    assert_eq!(
        step.effects,
        vec![ExecutionEffect::OpenInViewer {
            path: PathBuf::from("/w/index.html")
        }]
    );
    assert_eq!(orch.phase(), ExecutionPhase::Finished);
    assert_eq!(orch.active_process(), None);
}

#[test]
fn launch_failure_returns_to_idle() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::Python, Path::new("/w/main.py"), saved)
        .expect("run");
    let (run, _, _) = spawned(&step)[0].clone();

    let step = orch.process_launch_failed(run, "python3", "not found");
    assert_eq!(orch.phase(), ExecutionPhase::Idle);
    assert_eq!(
        step.notices,
        vec![ExecutionNotice::LaunchFailed {
            program: "python3".to_string(),
            reason: "not found".to_string(),
        }]
    );
    orch.run(LanguageId::Python, Path::new("/w/main.py"), saved)
        .expect("usable again");
}

#[test]
fn interrupt_kills_the_active_process_and_cleans_up_on_exit() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::C, Path::new("/w/main.c"), saved)
        .expect("run");
    let (compile, _, _) = spawned(&step)[0].clone();
    orch.process_spawned(compile);
    let step = orch.process_exited(compile, Some(0));
    let (run, _, _) = spawned(&step)[0].clone();

    let step = orch.interrupt();
    assert_eq!(step.effects, vec![ExecutionEffect::Kill { process: run }]);
    assert_eq!(orch.phase(), ExecutionPhase::Idle);

    // Late output of the killed process is not shown.
    assert_eq!(
        orch.process_output(run, ConsoleStream::Stdout, b"late\n"),
        OutputRoute::Ignored
    );

    let exit = orch.process_exited(run, None);
    assert!(exit.notices.is_empty());
    assert_eq!(cleanups(&exit).len(), 1);
    assert_eq!(orch.phase(), ExecutionPhase::Idle);
}

#[test]
fn late_exit_of_an_interrupted_job_spares_the_artifact_of_the_next_one() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::C, Path::new("/w/main.c"), saved)
        .expect("run");
    let (old_compile, _, _) = spawned(&step)[0].clone();
    orch.process_spawned(old_compile);
    orch.interrupt();

    let step = orch
        .run(LanguageId::C, Path::new("/w/other.c"), saved)
        .expect("second run");
    let (new_compile, _, _) = spawned(&step)[0].clone();
    orch.process_spawned(new_compile);
    let step = orch.process_exited(new_compile, Some(0));
    let (run, _, _) = spawned(&step)[0].clone();

    let late = orch.process_exited(old_compile, None);
    assert!(cleanups(&late).is_empty());
    assert_eq!(orch.phase(), ExecutionPhase::Running);

    let done = orch.process_exited(run, Some(0));
    assert_eq!(
        cleanups(&done),
        vec![Artifact::File(
            Path::new("/w").join(adapter::NATIVE_ARTIFACT)
        )]
    );
}

#[test]
fn late_exit_in_another_directory_still_cleans_up() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::C, Path::new("/w/main.c"), saved)
        .expect("run");
    let (old_compile, _, _) = spawned(&step)[0].clone();
    orch.interrupt();

    orch.run(LanguageId::C, Path::new("/elsewhere/main.c"), saved)
        .expect("second run");
    let late = orch.process_exited(old_compile, None);
    assert_eq!(
        cleanups(&late),
        vec![Artifact::File(
            Path::new("/w").join(adapter::NATIVE_ARTIFACT)
        )]
    );
}

#[test]
fn interrupt_with_nothing_running_is_a_no_op() {
    let mut orch = orchestrator();
    assert_eq!(orch.interrupt(), ExecutionStep::default());
}

#[test]
fn messages_from_untracked_processes_are_ignored() {
    let mut orch = orchestrator();
    let step = orch
        .run(LanguageId::Python, Path::new("/w/main.py"), saved)
        .expect("run");
    let (run, _, _) = spawned(&step)[0].clone();
    let stranger = ProcessId(run.0 + 100);

    assert_eq!(
        orch.process_output(stranger, ConsoleStream::Stdout, b"x"),
        OutputRoute::Ignored
    );
    assert_eq!(orch.process_exited(stranger, Some(3)), ExecutionStep::default());
    assert_eq!(orch.phase(), ExecutionPhase::Running);
}
