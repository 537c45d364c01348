#![cfg(unix)]

use std::path::Path;
use std::process::{Command, Output};

/// Writes a config whose collaborators append what they were given to `log`.
fn write_config(dir: &Path, dashboard: &str, on_missing: &str) -> std::path::PathBuf {
    let log = dir.join("calls.log");
    let log = log.display();
    let config = format!(
        r#"interrupt_grace = "1s"

[tools]
run_registry = "sh -c 'echo create \"$*\" >> {log}' registry {{args}}"
dashboard = "{dashboard}"
session_probe = "sh -c 'exit 1'"
session_attach = "sh -c 'echo attach \"$0\" >> {log}' {{path}}"

[session]
on_missing = "{on_missing}"
"#
    );
    let path = dir.join("runctl.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn recording_dashboard(dir: &Path) -> String {
    format!(
        "sh -c 'echo dashboard \\\"$0\\\" \\\"$1\\\" >> {}' {{port}} {{dir}}",
        dir.join("calls.log").display()
    )
}

fn run_runctl(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_runctl"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run runctl binary")
}

fn calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn port_and_path_create_launch_and_attach() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &recording_dashboard(dir.path()), "fail");

    let out = run_runctl(&config, &["new-run", "6006", "--path=/runs/exp/3", "--seed=1"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        calls(dir.path()),
        [
            "create --path=/runs/exp/3 --seed=1",
            "dashboard 6006 /runs/exp",
            "attach /runs/exp/3",
        ]
    );
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Dashboard: port 6006 on /runs/exp"));
}

#[test]
fn out_of_range_port_is_still_split_off_and_passed_to_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &recording_dashboard(dir.path()), "fail");

    let out = run_runctl(&config, &["new-run", "70000", "--path=/a/b/1", "--seed=1"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        calls(dir.path()),
        [
            "create --path=/a/b/1 --seed=1",
            "dashboard 70000 /a/b",
            "attach /a/b/1",
        ]
    );
}

#[test]
fn without_port_no_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &recording_dashboard(dir.path()), "fail");

    let out = run_runctl(&config, &["new-run", "--path=/runs/exp/3"]);
    assert!(out.status.success());
    assert_eq!(
        calls(dir.path()),
        ["create --path=/runs/exp/3", "attach /runs/exp/3"]
    );
}

#[test]
fn dashboard_failure_still_attaches_and_sets_status() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "sh -c 'exit 7'", "fail");

    let out = run_runctl(&config, &["new-run", "6006", "--path=/runs/exp/3"]);
    assert_eq!(out.status.code(), Some(7));
    assert_eq!(
        calls(dir.path()),
        ["create --path=/runs/exp/3", "attach /runs/exp/3"]
    );
}

#[test]
fn missing_session_is_skipped_under_skip_policy() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &recording_dashboard(dir.path()), "skip");

    let out = run_runctl(&config, &["new-run", "--path=/runs/exp/3"]);
    assert!(out.status.success());
    assert_eq!(calls(dir.path()), ["create --path=/runs/exp/3"]);
}

#[test]
fn duplicate_path_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &recording_dashboard(dir.path()), "fail");

    let out = run_runctl(&config, &["new-run", "--path=/a/1", "--path=/b/2"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(calls(dir.path()).is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("more than once"));
}

#[test]
fn dry_run_prints_plan_and_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &recording_dashboard(dir.path()), "fail");

    let out = run_runctl(&config, &["--dry-run", "new-run", "6006", "--path=/runs/exp/3"]);
    assert!(out.status.success());
    assert!(calls(dir.path()).is_empty());
    let plan: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(plan["plan"]["run_dir"], "/runs/exp");
    assert_eq!(plan["plan"]["run_path"], "/runs/exp/3");
    assert_eq!(plan["steps"].as_array().unwrap().len(), 3);
}
