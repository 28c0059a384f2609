//! Integration tests for the gatherer CLI.
//!
//! Everything here runs without network access: either the arguments are rejected before any
//! request is made, or the run is metadata-only over cached records.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

// Helper function to create a command that ignores any user configuration
fn gatherer(dir: &TempDir) -> Command {
  let mut cmd = Command::cargo_bin("gatherer").unwrap();
  cmd.arg("--config").arg(dir.path().join("missing.toml"));
  cmd
}

// Helper to write a cached records file
fn records(dir: &TempDir) -> PathBuf {
  let path = dir.path().join("records.json");
  std::fs::write(
    &path,
    r#"[
      { "title": "Attention Is All You Need", "authors": ["Ashish Vaswani"], "arxiv_id": "1706.03762" },
      { "title": "BERT", "authors": "Jacob Devlin, Ming-Wei Chang", "url": "http://arxiv.org/abs/1810.04805" }
    ]"#,
  )
  .unwrap();
  path
}

#[test]
fn test_help_lists_commands() {
  Command::cargo_bin("gatherer")
    .unwrap()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("terms"))
    .stdout(predicate::str::contains("combine"))
    .stdout(predicate::str::contains("titles"))
    .stdout(predicate::str::contains("cached"));
}

#[test]
fn test_empty_group_is_rejected() {
  let dir = tempdir().unwrap();
  gatherer(&dir)
    .args(["combine", "--group", "LLM,VLM", "--group", " , "])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Term groups must contain at least one term"));
}

#[test]
fn test_terms_require_a_term() {
  let dir = tempdir().unwrap();
  gatherer(&dir).arg("terms").assert().failure();
}

#[test]
fn test_range_needs_both_ends() {
  let dir = tempdir().unwrap();
  gatherer(&dir).args(["terms", "agents", "--from", "2025-01-01"]).assert().failure();
}

#[test]
fn test_backwards_range_is_rejected() {
  let dir = tempdir().unwrap();
  gatherer(&dir)
    .args(["terms", "agents", "--from", "2025-02-01", "--to", "2025-01-01"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid date range"));
}

#[test]
fn test_cached_metadata_only_to_stdout() {
  let dir = tempdir().unwrap();
  let records = records(&dir);

  gatherer(&dir)
    .arg("cached")
    .arg(&records)
    .arg("--no-download")
    .assert()
    .success()
    .stdout(predicate::str::contains("\"title\": \"Attention Is All You Need\""))
    .stdout(predicate::str::contains("https://arxiv.org/pdf/1706.03762.pdf"))
    .stdout(predicate::str::contains("Ming-Wei Chang"))
    .stderr(predicate::str::contains("2 papers"));
}

#[test]
fn test_cached_output_file() {
  let dir = tempdir().unwrap();
  let records = records(&dir);
  let output = dir.path().join("papers.json");

  gatherer(&dir)
    .arg("cached")
    .arg(&records)
    .args(["--no-download", "--output"])
    .arg(&output)
    .assert()
    .success()
    .stdout(predicate::str::is_empty());

  let papers: Vec<serde_json::Value> =
    serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
  assert_eq!(papers.len(), 2);
  assert_eq!(papers[1]["pdf_url"], "http://arxiv.org/pdf/1810.04805");
  assert!(papers[0]["pdf_path"].is_null());
}

#[test]
fn test_log_file() {
  let dir = tempdir().unwrap();
  let records = records(&dir);
  let log = dir.path().join("logs").join("gatherer.log");

  gatherer(&dir)
    .arg("-vvvv")
    .arg("--log-file")
    .arg(&log)
    .arg("cached")
    .arg(&records)
    .arg("--no-download")
    .assert()
    .success();

  assert!(log.exists());
}
