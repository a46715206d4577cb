use crate::kernel::language::{ExecutionKind, LanguageId};
use std::path::Path;

#[test]
fn from_path_maps_supported_extensions() {
    let cases = [
        ("a.py", LanguageId::Python),
        ("a.PY", LanguageId::Python),
        ("a.c", LanguageId::C),
        ("a.h", LanguageId::C),
        ("a.cpp", LanguageId::Cpp),
        ("a.cc", LanguageId::Cpp),
        ("a.java", LanguageId::Java),
        ("a.js", LanguageId::JavaScript),
        ("a.html", LanguageId::Html),
        ("a.htm", LanguageId::Html),
        ("a.css", LanguageId::Css),
        ("a.txt", LanguageId::Text),
        ("Makefile", LanguageId::Text),
    ];

    for (path, expected) in cases {
        assert_eq!(LanguageId::from_path(Path::new(path)), expected, "{path}");
    }
}

#[test]
fn from_name_accepts_display_names() {
    for lang in LanguageId::ALL {
        assert_eq!(LanguageId::from_name(lang.name()), Some(lang));
    }
    assert_eq!(LanguageId::from_name("C++"), Some(LanguageId::Cpp));
    assert_eq!(LanguageId::from_name("cobol"), None);
}

#[test]
fn execution_kind_splits_interpreted_compiled_and_browser() {
    assert_eq!(LanguageId::Python.execution_kind(), ExecutionKind::Interpreted);
    assert_eq!(LanguageId::C.execution_kind(), ExecutionKind::Compiled);
    assert_eq!(LanguageId::Cpp.execution_kind(), ExecutionKind::Compiled);
    assert_eq!(LanguageId::Java.execution_kind(), ExecutionKind::Compiled);
    assert_eq!(LanguageId::Html.execution_kind(), ExecutionKind::Browser);
    assert_eq!(LanguageId::JavaScript.execution_kind(), ExecutionKind::Browser);
    assert_eq!(LanguageId::Css.execution_kind(), ExecutionKind::Unsupported);
    assert_eq!(LanguageId::Text.execution_kind(), ExecutionKind::Unsupported);
}

#[test]
fn default_extension_round_trips_through_from_path() {
    for lang in LanguageId::ALL {
        let path = format!("file.{}", lang.default_extension());
        assert_eq!(LanguageId::from_path(Path::new(&path)), lang);
    }
}
