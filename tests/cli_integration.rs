//! Integration tests for the `tt` CLI.
//!
//! Each test runs `tt` as a subprocess inside a temp directory and checks
//! stdout and/or the state file it leaves behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Get the path to the built `tt` binary.
fn tt_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tt");
    path
}

fn run_tt(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tt_bin())
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run tt");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_tt_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tt(dir, args);
    assert!(
        success,
        "tt {:?} failed:\nstdout: {}\nstderr: {}",
        args, stdout, stderr
    );
    stdout
}

/// A project with: 1 Release (High) > 2 Docs, 3 Tag; 4 Fix login (Low)
fn sample(dir: &Path) {
    run_tt_ok(dir, &["add", "Release", "--priority", "high"]);
    run_tt_ok(dir, &["add", "Docs", "--parent", "1", "--estimate", "1h30m"]);
    run_tt_ok(dir, &["add", "Tag", "--parent", "1", "--estimate", "15m"]);
    run_tt_ok(dir, &["add", "Fix login", "--priority", "low"]);
}

fn tree(dir: &Path) -> Vec<String> {
    run_tt_ok(dir, &["tree"]).lines().map(str::to_string).collect()
}

#[test]
fn test_add_and_tree() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    assert_eq!(
        tree(dir.path()),
        vec![
            "  1 [ ]! Release (2 Tasks, 0% Completed, Estimated: 1 h 45 min)",
            "      2 [ ]  Docs (1 h 30 min)",
            "      3 [ ]  Tag (15 min)",
            "  4 [ ]? Fix login",
        ]
    );
    let xml = fs::read_to_string(dir.path().join("tasks.xml")).unwrap();
    assert!(xml.contains("title=\"Docs\""));
    assert!(xml.contains("estimated=\"5400000\""));
}

#[test]
fn test_empty_tree() {
    let dir = TempDir::new().unwrap();
    assert_eq!(run_tt_ok(dir.path(), &["tree"]), "(no tasks)\n");
}

#[test]
fn test_done_rolls_up_to_parent() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    run_tt_ok(dir.path(), &["done", "2"]);
    run_tt_ok(dir.path(), &["done", "3"]);
    let lines = tree(dir.path());
    assert_eq!(
        lines[0],
        "  1 [x]! Release (2 Tasks, 100% Completed, Estimated: 1 h 45 min)"
    );
}

#[test]
fn test_done_on_container_is_rejected() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    let (_, stderr, success) = run_tt(dir.path(), &["done", "1"]);
    assert!(success);
    assert!(stderr.contains("cannot be completed"));
    let xml = fs::read_to_string(dir.path().join("tasks.xml")).unwrap();
    assert!(!xml.contains("completed=\"true\""));
}

#[test]
fn test_unknown_id_is_an_error() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    let (_, stderr, success) = run_tt(dir.path(), &["rm", "42"]);
    assert!(!success);
    assert!(stderr.contains("no task with id 42"));
}

#[test]
fn test_group_by_priority_persists() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    run_tt_ok(dir.path(), &["group", "on"]);
    let lines = tree(dir.path());
    assert_eq!(lines[0], "High (1 Tasks, 0% Completed)");
    assert!(lines.contains(&"Normal (0 Tasks, 0% Completed)".to_string()));
    assert!(lines.contains(&"Low (1 Tasks, 0% Completed)".to_string()));

    run_tt_ok(dir.path(), &["group", "off"]);
    assert_eq!(tree(dir.path())[0], "  1 [ ]! Release (2 Tasks, 0% Completed, Estimated: 1 h 45 min)");
}

#[test]
fn test_hide_completed() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    run_tt_ok(dir.path(), &["done", "4"]);
    run_tt_ok(dir.path(), &["hide-completed", "on"]);
    let lines = tree(dir.path());
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| !l.contains("Fix login")));
}

#[test]
fn test_move_up_and_down() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    run_tt_ok(dir.path(), &["up", "3"]);
    let lines = tree(dir.path());
    assert!(lines[1].contains("Tag"));
    assert!(lines[2].contains("Docs"));

    // ids follow load order, so Tag is now 2
    let (_, stderr, success) = run_tt(dir.path(), &["up", "2"]);
    assert!(success);
    assert!(stderr.contains("already first"));

    run_tt_ok(dir.path(), &["down", "1"]);
    assert!(tree(dir.path())[0].contains("Fix login"));
}

#[test]
fn test_edit_moves_and_retitles() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    run_tt_ok(dir.path(), &["edit", "4", "--parent", "1", "--title", "Fix auth"]);
    let lines = tree(dir.path());
    assert_eq!(lines.len(), 4);
    assert!(lines[3].starts_with("      4"));
    assert!(lines[3].contains("Fix auth"));

    run_tt_ok(dir.path(), &["edit", "4", "--parent", "root"]);
    assert!(tree(dir.path())[3].starts_with("  4"));
}

#[test]
fn test_edit_into_own_subtree_fails() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    let (_, stderr, success) = run_tt(dir.path(), &["edit", "1", "--parent", "2"]);
    assert!(!success);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_highlight_with_color() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    run_tt_ok(dir.path(), &["highlight", "2", "--color", "green"]);
    assert!(tree(dir.path())[1].ends_with("<green>"));
    run_tt_ok(dir.path(), &["unhighlight", "2"]);
    assert!(!tree(dir.path())[1].contains('<'));
}

#[test]
fn test_rm_removes_subtree() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    let out = run_tt_ok(dir.path(), &["rm", "1"]);
    assert_eq!(out, "Deleted task 1: Release\n");
    assert_eq!(tree(dir.path()), vec!["  1 [ ]? Fix login"]);
}

#[test]
fn test_list_json() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    let out = run_tt_ok(dir.path(), &["list", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    let tasks = json.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["title"], "Release");
    assert_eq!(tasks[0]["priority"], "Important");
    assert_eq!(tasks[0]["estimated_ms"], 6_300_000);
    assert_eq!(tasks[0]["subtasks"].as_array().unwrap().len(), 2);
}

#[test]
fn test_export_to_file() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    run_tt_ok(dir.path(), &["export", "--out", "out.txt"]);
    let text = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(text, "Release\n    Docs\n    Tag\nFix login\n");
}

#[test]
fn test_todo_comment() {
    let dir = TempDir::new().unwrap();
    run_tt_ok(dir.path(), &["todo", "// TODO: handle timeouts"]);
    assert_eq!(tree(dir.path()), vec!["  1 [ ]  handle timeouts"]);

    let (_, stderr, success) = run_tt(dir.path(), &["todo", "// TODO:"]);
    assert!(success);
    assert!(stderr.contains("no task text"));
}

#[test]
fn test_settings_actual_time() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    run_tt_ok(
        dir.path(),
        &["settings", "--enable-actual-time", "true", "--ask-actual", "true"],
    );
    run_tt_ok(dir.path(), &["done", "3", "--actual", "20m"]);
    let lines = tree(dir.path());
    assert_eq!(lines[2], "      3 [x]  Tag (Estimated: 15 min, Actual: 20 min)");

    let out = run_tt_ok(dir.path(), &["settings", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["enable_actual_time"], true);
    assert_eq!(json["propagate_priority"], false);
}

#[test]
fn test_propagate_priority() {
    let dir = TempDir::new().unwrap();
    run_tt_ok(dir.path(), &["add", "Parent"]);
    run_tt_ok(dir.path(), &["add", "Urgent", "--parent", "1", "--priority", "high"]);
    assert!(tree(dir.path())[0].starts_with("  1 [ ]  Parent"));
    run_tt_ok(dir.path(), &["settings", "--propagate-priority", "true"]);
    assert!(tree(dir.path())[0].starts_with("  1 [ ]! Parent"));
}

#[test]
fn test_parents_excludes_subtree() {
    let dir = TempDir::new().unwrap();
    sample(dir.path());
    let out = run_tt_ok(dir.path(), &["parents", "1", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    let ids: Vec<u64> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![4]);
}

#[test]
fn test_explicit_file_and_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tasktree.toml"),
        "[storage]\nfile = \"mine.xml\"\n\n[display]\nshow_ids = false\n",
    )
    .unwrap();
    run_tt_ok(dir.path(), &["add", "Configured"]);
    assert!(dir.path().join("mine.xml").exists());
    assert_eq!(tree(dir.path()), vec!["[ ]  Configured"]);

    run_tt_ok(dir.path(), &["-f", "other.xml", "add", "Elsewhere"]);
    assert!(dir.path().join("other.xml").exists());
    assert_eq!(tree(dir.path()).len(), 1);
}

#[test]
fn test_edit_keeps_untitled_task_untitled() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tasks.xml"),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <component name=\"Tasks\">\n  <tasks>\n    \
         <task priority=\"Normal\" completed=\"false\" estimated=\"0\" created=\"1700000003000\" \
         actual=\"0\" highlighted=\"false\" highlightingtype=\"Red\"/>\n  </tasks>\n</component>\n",
    )
    .unwrap();
    run_tt_ok(dir.path(), &["edit", "1", "--priority", "high"]);

    let xml = fs::read_to_string(dir.path().join("tasks.xml")).unwrap();
    assert!(xml.contains("priority=\"Important\""));
    assert!(!xml.contains("title="));

    let out = run_tt_ok(dir.path(), &["list", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json[0]["title"], serde_json::Value::Null);
}
