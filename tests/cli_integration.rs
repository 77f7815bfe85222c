//! Integration tests for the `tb` CLI.
//!
//! Each test works in a temp directory, runs `tb` as a subprocess, and
//! verifies stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Get the path to the built `tb` binary.
fn tb_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tb");
    path
}

/// Run `tb` with the given args in the given directory, returning (stdout, stderr, success).
fn run_tb(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tb_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("TASKBOARD_LOG")
        .output()
        .expect("failed to run tb");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `tb` expecting success, return stdout.
fn run_tb_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tb(dir, args);
    if !success {
        panic!(
            "tb {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `tb` expecting failure, return stderr.
fn run_tb_err(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tb(dir, args);
    if success {
        panic!("tb {:?} unexpectedly succeeded:\nstdout: {}", args, stdout);
    }
    stderr
}

const SEED_ITEMS: &str = r#"[
    {"todoId": 1, "content": "A"},
    {"todoId": 2, "content": "B"},
    {"todoId": 3, "content": "C"}
]"#;

fn write_script(dir: &Path, name: &str, steps: &str) -> String {
    let script = format!("{{\"items\": {}, \"steps\": {}}}", SEED_ITEMS, steps);
    fs::write(dir.join(name), script).unwrap();
    name.to_string()
}

const SWIPE_FAILS: &str = r#"[
    {"op": "load"},
    {"op": "settle"},
    {"op": "fail_next", "call": "delete", "error": {"kind": "network", "message": "offline"}},
    {"op": "horizontal_start", "item": 2},
    {"op": "move", "dx": -201},
    {"op": "release"},
    {"op": "settle"}
]"#;

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn test_init_writes_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_tb_ok(tmp.path(), &["init"]);
    assert!(out.contains("taskboard.toml"));

    let written = fs::read_to_string(tmp.path().join("taskboard.toml")).unwrap();
    assert!(written.contains("page_size = 8"));
    assert!(written.contains("swipe_threshold = 200.0"));
}

#[test]
fn test_init_refuses_overwrite() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_tb_ok(tmp.path(), &["init"]);
    let err = run_tb_err(tmp.path(), &["init"]);
    assert!(err.contains("already exists"));
    run_tb_ok(tmp.path(), &["init", "--force"]);
}

#[test]
fn test_init_custom_path() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_tb_ok(tmp.path(), &["-c", "conf/board.toml", "init"]);
    assert!(tmp.path().join("conf/board.toml").exists());
}

// ---------------------------------------------------------------------------
// replay
// ---------------------------------------------------------------------------

#[test]
fn test_replay_rollback_text() {
    let tmp = tempfile::TempDir::new().unwrap();
    let script = write_script(tmp.path(), "swipe.json", SWIPE_FAILS);
    let out = run_tb_ok(tmp.path(), &["replay", &script]);

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "1: load page 0");
    assert_eq!(lines[1], "2: page 0 loaded (3 items)");
    assert_eq!(lines[2], "4: swiping #2");
    assert_eq!(lines[3], "6: swiped, m1 delete sent");
    assert_eq!(
        lines[4],
        "7: m1 ! delete #2 rolled back (network): network error: offline"
    );
    assert!(out.contains("backlog (3 of 3)"));
    assert!(out.contains("#2    B"));
    assert_eq!(
        lines.last().copied(),
        Some("! delete #2 rolled back (network): network error: offline")
    );
}

#[test]
fn test_replay_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    let script = write_script(tmp.path(), "swipe.json", SWIPE_FAILS);
    let out = run_tb_ok(tmp.path(), &["--json", "replay", &script]);

    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    let ids: Vec<i64> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(json["failures"].as_array().unwrap().len(), 1);
    assert_eq!(json["failures"][0]["kind"], "DELETE");
    assert_eq!(json["failures"][0]["error_kind"], "network");
    assert_eq!(json["in_flight"].as_array().unwrap().len(), 0);
}

#[test]
fn test_replay_commit_removes_item() {
    let tmp = tempfile::TempDir::new().unwrap();
    let script = write_script(
        tmp.path(),
        "ok.json",
        r#"[
            {"op": "load"},
            {"op": "settle"},
            {"op": "horizontal_start", "item": 2},
            {"op": "move", "dx": -250},
            {"op": "release"},
            {"op": "settle"}
        ]"#,
    );
    let out = run_tb_ok(tmp.path(), &["replay", &script]);
    assert!(out.contains("m1 delete #2 committed"));
    assert!(out.contains("backlog (2 of 3)"));
    assert!(!out.contains("rolled back"));
}

#[test]
fn test_replay_uses_configured_swipe_direction() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("taskboard.toml"),
        "[lists]\nbacklog_swipe = \"right\"\n",
    )
    .unwrap();
    let script = write_script(
        tmp.path(),
        "right.json",
        r#"[
            {"op": "load"},
            {"op": "settle"},
            {"op": "horizontal_start", "item": 1},
            {"op": "move", "dx": 201},
            {"op": "release"},
            {"op": "settle"}
        ]"#,
    );
    let out = run_tb_ok(tmp.path(), &["replay", &script]);
    assert!(out.contains("m1 delete #1 committed"));
}

#[test]
fn test_replay_hung_call_reported_in_flight() {
    let tmp = tempfile::TempDir::new().unwrap();
    let script = write_script(
        tmp.path(),
        "hang.json",
        r#"[
            {"op": "load"},
            {"op": "settle"},
            {"op": "hang", "call": "bookmark"},
            {"op": "bookmark", "item": 3},
            {"op": "settle"}
        ]"#,
    );
    let out = run_tb_ok(tmp.path(), &["replay", &script]);
    assert!(out.contains("in flight: m1 bookmark #3"));
}

#[test]
fn test_replay_bad_script() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.json"), "{\"steps\": [{\"op\": \"fly\"}]}").unwrap();
    let err = run_tb_err(tmp.path(), &["replay", "bad.json"]);
    assert!(err.starts_with("error: could not parse script"));
}

#[test]
fn test_replay_missing_script() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = run_tb_err(tmp.path(), &["replay", "nope.json"]);
    assert!(err.contains("could not read nope.json"));
}

// ---------------------------------------------------------------------------
// remote commands
// ---------------------------------------------------------------------------

#[test]
fn test_bad_config_is_reported() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(tmp.path().join("taskboard.toml"), "[paging]\npage_size = \"x\"\n").unwrap();
    let err = run_tb_err(tmp.path(), &["list"]);
    assert!(err.contains("could not parse taskboard.toml"));
}

#[test]
fn test_invalid_id_rejected_before_network() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = run_tb_err(tmp.path(), &["rm", "abc"]);
    assert!(err.contains("invalid item id: abc"));
}

#[test]
fn test_unreachable_server_is_network_error() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("taskboard.toml"),
        "[api]\nbase_url = \"http://127.0.0.1:9\"\n",
    )
    .unwrap();
    let err = run_tb_err(tmp.path(), &["list"]);
    assert!(err.contains("network error"));
}

#[test]
fn test_list_kind_flag() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("taskboard.toml"),
        "[api]\nbase_url = \"http://127.0.0.1:9\"\n",
    )
    .unwrap();
    let err = run_tb_err(tmp.path(), &["--list", "today", "list"]);
    assert!(err.contains("network error"));

    let err = run_tb_err(tmp.path(), &["--list", "someday", "list"]);
    assert!(err.contains("someday"));
}

#[test]
fn test_deadline_day_count_out_of_range() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = run_tb_err(tmp.path(), &["deadline", "1", "D-100000000000"]);
    assert!(err.contains("invalid day count"));
}
