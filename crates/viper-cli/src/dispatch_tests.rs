//! Tests for argument parsing and output naming.

use std::path::PathBuf;

use crate::cli::{DumpMode, Params, build_cli};
use crate::commands::output_path;

fn params_from(args: &[&str]) -> Params {
    let matches = build_cli().get_matches_from(args);
    Params::from_matches(&matches)
}

#[test]
fn minimal_invocation() {
    let params = params_from(&["viperc", "demo.vp"]);
    assert_eq!(params.input, PathBuf::from("demo.vp"));
    assert_eq!(params.out, None);
    assert!(!params.run);
    assert_eq!(params.dump, None);
}

#[test]
fn out_and_run_flags() {
    let params = params_from(&["viperc", "demo.vp", "-o", "demo_bin", "-r"]);
    assert_eq!(params.out, Some(PathBuf::from("demo_bin")));
    assert!(params.run);
}

#[test]
fn dump_flags() {
    assert_eq!(
        params_from(&["viperc", "x.vp", "--dump-tokens"]).dump,
        Some(DumpMode::Tokens)
    );
    assert_eq!(
        params_from(&["viperc", "x.vp", "--dump-ast"]).dump,
        Some(DumpMode::Ast)
    );
    assert_eq!(
        params_from(&["viperc", "x.vp", "--dump-scopes"]).dump,
        Some(DumpMode::Scopes)
    );
    assert_eq!(
        params_from(&["viperc", "x.vp", "--dump-c"]).dump,
        Some(DumpMode::C)
    );
}

#[test]
fn default_output_strips_the_extension() {
    let params = params_from(&["viperc", "examples/demo.vp"]);
    assert_eq!(output_path(&params), PathBuf::from("demo"));
}

#[test]
fn explicit_output_wins() {
    let params = params_from(&["viperc", "demo.vp", "--out", "custom"]);
    assert_eq!(output_path(&params), PathBuf::from("custom"));
}

#[test]
fn missing_input_is_rejected() {
    assert!(build_cli().try_get_matches_from(["viperc"]).is_err());
}

#[test]
fn dump_c_succeeds_on_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.vp");
    std::fs::write(&path, "a: int = 1 + 2\nprint(a)\n").unwrap();

    let params = params_from(&[
        "viperc",
        path.to_str().unwrap(),
        "--dump-c",
    ]);
    assert_eq!(crate::commands::run(params), 0);
}

#[test]
fn compile_errors_exit_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.vp");
    std::fs::write(&path, "x = 1 + \"s\"\n").unwrap();

    let params = params_from(&["viperc", path.to_str().unwrap(), "--dump-c"]);
    assert_eq!(crate::commands::run(params), 1);
}

#[test]
fn missing_file_exits_nonzero() {
    let params = params_from(&["viperc", "does_not_exist.vp"]);
    assert_eq!(crate::commands::run(params), 1);
}
