//! Binary-level tests for the `policy-assistant` command line.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MANUAL: &str = "# Organization Policies\n\n\
## Hardware Requests\n\n\
Employees submit hardware requests to their manager.\n\
Manager approval is required up to 5000.\n\
Director approval is required above 5000.\n\n\
## Leave\n\n\
HR approves leave requests after manager approval.\n";

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("policy-assistant").unwrap();
    cmd.env_remove("POLICY_DB_PATH").env("RUST_LOG", "error");
    cmd
}

fn initialized() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("kb.db").to_string_lossy().into_owned();
    cmd().args(["--db-path", &db, "init"]).assert().success();
    (dir, db)
}

#[test]
fn test_help_lists_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("tools"));
}

#[test]
fn test_init_twice_requires_force() {
    let (_dir, db) = initialized();
    cmd()
        .args(["--db-path", &db, "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    cmd()
        .args(["--db-path", &db, "init", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized policy knowledge base"));
}

#[test]
fn test_status_without_init_fails() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("none.db");
    cmd()
        .args(["--db-path", db.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_ingest_search_list() {
    let (dir, db) = initialized();
    let manual = dir.path().join("handbook.md");
    std::fs::write(&manual, MANUAL).unwrap();

    cmd()
        .args(["--db-path", &db, "ingest", manual.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ingested 'handbook'"));

    cmd()
        .args(["--db-path", &db, "--format", "json", "search", "director approval"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source\": \"handbook\""))
        .stdout(predicate::str::contains("Hardware Requests"));

    cmd()
        .args(["--db-path", &db, "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("handbook"));

    cmd()
        .args(["--db-path", &db, "rm", "handbook"])
        .assert()
        .success();
    cmd()
        .args(["--db-path", &db, "rm", "handbook"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Document not found"));
}

#[test]
fn test_tools_role() {
    cmd()
        .args(["tools", "role", "manager"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Approval limit: 5000"));

    cmd()
        .args(["--format", "json", "tools", "role", "intern"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"found\": false"))
        .stdout(predicate::str::contains("\"available_roles\""));
}

#[test]
fn test_tools_count() {
    cmd()
        .args([
            "tools",
            "count",
            "--text",
            "Manager approval\nDirector APPROVAL\nnone",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("'approval' appears on 2 line(s)"));
}

#[test]
fn test_tools_calc() {
    cmd()
        .args(["tools", "calc", "factorial", "--n", "5"])
        .assert()
        .success()
        .stdout("factorial: 120\n");

    cmd()
        .args(["--format", "json", "tools", "calc", "square_root", "--n", "-4"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Square root of a negative number is undefined",
        ));

    cmd()
        .args(["tools", "calc", "modulo", "--a", "1", "--b", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid argument"));
}
