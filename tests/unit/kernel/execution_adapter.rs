use super::*;

#[test]
fn java_run_command_uses_the_public_class_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Prog.java");
    std::fs::write(&path, "public class HelloWorld {\n}\n").expect("write");

    let adapter = adapter_for(LanguageId::Java, &ToolchainSettings::default()).expect("adapter");
    assert_eq!(adapter.kind(), ExecutionKind::Compiled);
    let compile = adapter.compile_command(&path).expect("compile command");
    assert_eq!(compile.program, "javac");
    assert_eq!(compile.args, vec!["Prog.java".to_string()]);

    let run = adapter.run_command(&path);
    assert_eq!(run.program, "java");
    assert_eq!(run.args, vec!["HelloWorld".to_string()]);
}

#[test]
fn java_run_command_falls_back_to_the_file_stem() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Main.java");
    std::fs::write(&path, "class Hidden {}\n").expect("write");

    let adapter = adapter_for(LanguageId::Java, &ToolchainSettings::default()).expect("adapter");
    assert_eq!(adapter.run_command(&path).args, vec!["Main".to_string()]);
}

#[test]
fn toolchain_programs_come_from_settings() {
    let toolchain = ToolchainSettings {
        c_compiler: "clang".to_string(),
        ..ToolchainSettings::default()
    };
    let adapter = adapter_for(LanguageId::C, &toolchain).expect("adapter");
    let compile = adapter.compile_command(Path::new("/w/main.c")).expect("compile");
    assert_eq!(compile.program, "clang");
    assert_eq!(
        compile.args,
        vec![
            "main.c".to_string(),
            "-o".to_string(),
            NATIVE_ARTIFACT.to_string()
        ]
    );
}

#[test]
fn css_and_text_have_no_adapter() {
    let toolchain = ToolchainSettings::default();
    assert!(adapter_for(LanguageId::Css, &toolchain).is_none());
    assert!(adapter_for(LanguageId::Text, &toolchain).is_none());
}

#[test]
fn artifact_removal_deletes_fixed_files_and_extension_matches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let binary = dir.path().join(NATIVE_ARTIFACT);
    std::fs::write(&binary, b"bin").expect("write");
    std::fs::write(dir.path().join("A.class"), b"a").expect("write");
    std::fs::write(dir.path().join("B.class"), b"b").expect("write");
    std::fs::write(dir.path().join("Keep.java"), b"k").expect("write");

    let removed = remove_artifacts(&[
        Artifact::File(binary.clone()),
        Artifact::Extension {
            dir: dir.path().to_path_buf(),
            extension: "class".to_string(),
        },
        Artifact::File(dir.path().join("missing")),
    ]);

    assert_eq!(removed.len(), 3);
    assert!(!binary.exists());
    assert!(!dir.path().join("A.class").exists());
    assert!(dir.path().join("Keep.java").exists());
}

#[test]
fn working_dir_of_a_bare_file_name_is_the_current_dir() {
    assert_eq!(working_dir(Path::new("main.py")), PathBuf::from("."));
    assert_eq!(working_dir(Path::new("/w/main.py")), PathBuf::from("/w"));
}
