//! E2E tests for policy files and configuration

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CLI_BINARY: &str = env!("CARGO_BIN_EXE_datapol");

const NOVA_CONFIG: &str = r#"
[theories.nova]
complete = true
[theories.nova.tables]
servers = ["id", "name", "status"]
"#;

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(CLI_BINARY)
        .args(args)
        .current_dir(dir)
        .env_remove("DATAPOL_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|_| panic!("Failed to execute {CLI_BINARY}"))
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_compile_files_in_order() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "facts.dl", "// facts\np(1);\np(2);\n");
    write(dir.path(), "rules.dl", "# rules\nq(x) :- p(x)\n");

    let output = run_in(dir.path(), &["facts.dl", "rules.dl"]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "p(1)\np(2)\nq(x) :- p(x)\n"
    );
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["missing.dl"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_IO"));
    assert!(stderr.contains("missing.dl"));
}

#[test]
fn test_syntax_error_names_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "broken.dl", "p(1)\nq(x :- p(x)\n");

    let output = run_in(dir.path(), &["broken.dl"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.dl:2:"));
}

#[test]
fn test_default_config_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "datapol.toml", NOVA_CONFIG);

    let output = run_in(dir.path(), &["-c", "p(x) :- nova:servers(name=x)"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("p(x) :- nova:servers("));
    assert!(stdout.trim_end().ends_with("(_x_1_0, x, _x_1_2)"));
}

#[test]
fn test_explicit_config_path() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "policy.toml", NOVA_CONFIG);

    let output = run_in(
        dir.path(),
        &["--config", "policy.toml", "-c", "p(x) :- nova:servers(unknown=x)"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown"));
}

#[test]
fn test_config_from_environment() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "env.toml", "[compiler]\nuse_modules = false\n");

    let output = Command::new(CLI_BINARY)
        .args(["--format", "json", "-c", "nova:q(1)"])
        .current_dir(dir.path())
        .env("DATAPOL_CONFIG", dir.path().join("env.toml"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["fact"]["table"], "nova:q");
}

#[test]
fn test_invalid_config() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "datapol.toml", "[compiler\n");

    let output = run_in(dir.path(), &["-c", "p(1)"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("config parse error"));
}

#[test]
fn test_check_against_complete_schema() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "datapol.toml", NOVA_CONFIG);
    write(dir.path(), "policy.dl", "p(x) :- nova:flavors(x)\n");

    let output = run_in(dir.path(), &["--check", "policy.dl"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("flavors"));
}

#[test]
fn test_permitted_modals_from_config() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "datapol.toml",
        "[compiler]\npermitted_modals = [\"execute\", \"notify\"]\n",
    );

    let output = run_in(dir.path(), &["--check", "-c", "notify[p(x)] :- q(x)"]);

    assert!(output.status.success());
}
