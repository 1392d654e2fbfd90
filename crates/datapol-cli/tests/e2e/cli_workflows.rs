//! E2E tests for command-string workflows

use std::process::{Command, Output};

use tempfile::TempDir;

const CLI_BINARY: &str = env!("CARGO_BIN_EXE_datapol");

/// Run in an empty directory so no stray datapol.toml is picked up
fn run_command(args: &[&str]) -> Output {
    let dir = TempDir::new().unwrap();
    Command::new(CLI_BINARY)
        .args(args)
        .current_dir(dir.path())
        .env_remove("DATAPOL_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|_| panic!("Failed to execute {CLI_BINARY}"))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_compile_fact() {
    let output = run_command(&["-c", "p(1, \"a\")"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "p(1, \"a\")");
}

#[test]
fn test_compile_rules() {
    let output = run_command(&["-c", "q(x) :- p(x), not r(x); execute[nova:reboot(x)] :- q(x)"]);

    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "q(x) :- p(x), not r(x)\nexecute[nova:reboot(x)] :- q(x)\n"
    );
}

#[test]
fn test_syntax_error() {
    let output = run_command(&["-c", "p(x :- q(x)"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("ERR_SYNTAX"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_lex_error() {
    let output = run_command(&["-c", "p(x) :- q(x) & r(x)"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("ERR_LEX"));
}

#[test]
fn test_check_reports_unsafe_rule() {
    let output = run_command(&["--check", "-c", "p(x) :- q(y)"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("x"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_check_passes() {
    let output = run_command(&["--check", "-c", "p(x) :- q(x), not r(x)"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "p(x) :- q(x), not r(x)");
}

#[test]
fn test_check_rejects_unknown_modal() {
    let output = run_command(&["--check", "-c", "notify[p(x)] :- q(x)"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("execute"));
}

#[test]
fn test_strata() {
    let output = run_command(&["--strata", "-c", "p(x) :- q(x), not r(x); r(x) :- s(x)"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.lines().any(|line| line.starts_with("p: ")));
    assert!(text.lines().any(|line| line.starts_with("s: ")));
}

#[test]
fn test_strata_unstratified() {
    let output = run_command(&["--strata", "-c", "p(x) :- q(x), not p(x)"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not stratified"));
}

#[test]
fn test_json_format() {
    let output = run_command(&["--format", "json", "-c", "p(x) :- nova:q(x)"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["rule"]["heads"][0]["table"], "p");
    assert_eq!(value[0]["rule"]["body"][0]["service"], "nova");
}

#[test]
fn test_no_modules() {
    let output = run_command(&["--no-modules", "--format", "json", "-c", "nova:q(1)"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["fact"]["table"], "nova:q");
    assert!(value[0]["fact"]["service"].is_null());
}

#[test]
fn test_tree() {
    let output = run_command(&["--tree", "-c", "p(1)"]);

    assert!(output.status.success());
    assert!(!stdout(&output).trim().is_empty());
}

#[test]
fn test_no_input() {
    let output = run_command(&["--check"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("No policy given"));
}
