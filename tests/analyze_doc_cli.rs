//! Integration tests for the analyze_doc CLI.

use std::path::Path;
use std::process::{Command, Output};

fn run_analyze_doc(state_dir: &Path, args: &[&str]) -> Output {
  Command::new(env!("CARGO_BIN_EXE_analyze_doc"))
    .args(args)
    .env("ANALYZE_STATE_DIR", state_dir)
    .env_remove("ANALYZE_CONFIG")
    .output()
    .expect("run analyze_doc")
}

#[test]
fn analyze_doc_prints_usage_without_args() {
  let out = Command::new(env!("CARGO_BIN_EXE_analyze_doc"))
    .output()
    .expect("run analyze_doc");
  assert!(!out.status.success());
  let stderr = String::from_utf8_lossy(&out.stderr);
  assert!(stderr.contains("Usage") || stderr.contains("usage"), "{stderr}");
}

#[test]
fn analyze_doc_exits_1_for_missing_document() {
  let dir = tempfile::tempdir().expect("temp dir");
  let out = run_analyze_doc(dir.path(), &["analyze", "/nonexistent/notes.md"]);
  assert_eq!(out.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&out.stderr);
  assert!(stderr.contains("document not found"), "{stderr}");
}

#[test]
fn analyze_then_refine_then_clear() {
  let dir = tempfile::tempdir().expect("temp dir");
  let state_dir = dir.path().join("state");
  let doc = dir.path().join("notes.md");
  std::fs::write(&doc, "# Notes\nalpha beta gamma\n").expect("write doc");
  let doc = doc.to_str().expect("path");

  let out = run_analyze_doc(&state_dir, &["refine", doc]);
  assert_eq!(out.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&out.stderr).contains("no prior analysis"));

  let out = run_analyze_doc(&state_dir, &["analyze", doc]);
  let stdout = String::from_utf8_lossy(&out.stdout);
  assert!(
    out.status.success(),
    "stderr={}",
    String::from_utf8_lossy(&out.stderr)
  );
  assert!(stdout.contains("Analysis completed."), "{stdout}");
  assert!(stdout.contains(r#"["ingest", "research", "report"]"#), "{stdout}");
  assert!(stdout.contains("Iteration: 0"), "{stdout}");

  let out = run_analyze_doc(&state_dir, &["session", doc]);
  assert!(String::from_utf8_lossy(&out.stdout).contains("Checkpoint: yes"));

  let out = run_analyze_doc(&state_dir, &["refine", doc, "--from", "research"]);
  let stdout = String::from_utf8_lossy(&out.stdout);
  assert!(out.status.success(), "{stdout}");
  assert!(stdout.contains("Iteration: 1"), "{stdout}");
  let results = std::fs::read_dir(&state_dir)
    .expect("state dir")
    .filter_map(Result::ok)
    .any(|e| e.path().join("results.json").is_file());
  assert!(results);

  let out = run_analyze_doc(&state_dir, &["clear", doc]);
  assert!(String::from_utf8_lossy(&out.stdout).contains("Session cleared."));
  let out = run_analyze_doc(&state_dir, &["session", doc]);
  assert!(String::from_utf8_lossy(&out.stdout).contains("Checkpoint: no"));
}

#[test]
fn unknown_provider_is_rejected() {
  let dir = tempfile::tempdir().expect("temp dir");
  let doc = dir.path().join("notes.md");
  std::fs::write(&doc, "text").expect("write doc");
  let out = run_analyze_doc(
    dir.path(),
    &["analyze", doc.to_str().expect("path"), "--provider", "web"],
  );
  assert_eq!(out.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&out.stderr).contains("unknown research provider"));
}
