//! End-to-end tests for the `integra` binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn integra(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("integra").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("INTEGRA_CONFIG")
        .env_remove("INTEGRA_ENV")
        .env_remove("INTEGRA_LOGIN")
        .env_remove("INTEGRA_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

/// Config with a `raw` and a `work` file store under `dir`
fn workspace(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir.join("raw")).unwrap();
    write(
        &dir.join("raw"),
        "issues.json",
        &json!([
            {"key": "A-1", "status": "Open", "hours": 6},
            {"key": "A-2", "status": "Done", "hours": 3},
            {"key": "A-3", "status": "Open", "hours": 12}
        ]),
    );
    write(
        dir,
        "integra.json",
        &json!({
            "environment": "test",
            "params": {"test": {"done": "Done"}},
            "databases": {
                "raw": {"type": "json", "path": dir.join("raw")},
                "work": {"type": "json", "path": dir.join("work")}
            }
        }),
    )
}

fn pipeline(dir: &Path) -> PathBuf {
    fs::write(
        dir.join("pipeline.json"),
        r#"{
            "transformation-sets": {
                "sprint": {
                    "db": {"src.db": "raw", "dest.db": "work"},
                    "transformations": {
                        "open": {
                            "class": "col",
                            "cfg": {
                                "src.db.load": {"src": "issues"},
                                "transform": {"func": "filter_set", "params": {"where": "status != '$done'"}},
                                "dest.db.cleanup": {"target": "open"},
                                "dest.db.save": {"dest": "open"}
                            }
                        }
                    }
                }
            }
        }"#,
    )
    .unwrap();
    dir.join("pipeline.json")
}

fn hours_checks(dir: &Path) -> PathBuf {
    write(
        dir,
        "checks.json",
        &json!({
            "checks": {
                "hours": {
                    "constraint": {"func": "const", "params": {"value": 8}},
                    "to_validate": {"func": "return_input", "params": {"field": "hours"}},
                    "compare": {
                        "func": "limit_exceed",
                        "violation": {"severity": "error", "message": "More than {} hours"}
                    }
                }
            }
        }),
    )
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    integra(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transform"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_transform_writes_destination() {
    let dir = TempDir::new().unwrap();
    let config = workspace(dir.path());
    let pipeline = pipeline(dir.path());

    integra(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["-o", "json", "transform"])
        .arg(&pipeline)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"transformations\":1"));

    let open: Vec<Value> =
        serde_json::from_str(&fs::read_to_string(dir.path().join("work").join("open.json")).unwrap()).unwrap();
    assert_eq!(open.len(), 2);
    assert!(open.iter().all(|issue| issue["status"] == "Open"));
}

#[test]
fn test_run_reports_violations() {
    let dir = TempDir::new().unwrap();
    let config = workspace(dir.path());
    let pipeline = pipeline(dir.path());
    let checks = hours_checks(dir.path());
    let mut validate = serde_json::from_str::<Value>(&fs::read_to_string(&checks).unwrap()).unwrap();
    validate["db"] = json!("work");
    validate["collection"] = json!("open");
    validate["dest"] = json!("open_checked");
    let validate = write(dir.path(), "validate.json", &validate);
    let steps = write(
        dir.path(),
        "steps.json",
        &json!({
            "steps": {
                "reshape": {"type": "db.transformation", "cfg": pipeline},
                "check": {"type": "validate", "cfg": validate}
            }
        }),
    );

    integra(dir.path())
        .arg("-c")
        .arg(&config)
        .args(["-o", "json", "run", "--fail-on-violations"])
        .arg(&steps)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("\"violations\":1"));

    let checked: Vec<Value> = serde_json::from_str(
        &fs::read_to_string(dir.path().join("work").join("open_checked.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(checked.len(), 2);
}

#[test]
fn test_validate_exit_codes() {
    let dir = TempDir::new().unwrap();
    let checks = hours_checks(dir.path());
    let ok = write(dir.path(), "ok.json", &json!({"key": "A-1", "hours": 8}));
    let over = write(dir.path(), "over.json", &json!({"key": "A-2", "hours": 9}));

    integra(dir.path())
        .arg("validate")
        .arg(&checks)
        .arg(&ok)
        .assert()
        .success()
        .stdout(predicate::str::contains("No violations"));

    integra(dir.path())
        .args(["--no-color", "validate"])
        .arg(&checks)
        .arg(&over)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("[error] More than 8 hours"))
        .stderr(predicate::str::contains("1 violation(s) found"));
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    integra(dir.path())
        .args(["transform", "nowhere.json"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("File not found: nowhere.json"));
}

#[test]
fn test_config_init_and_show() {
    let dir = TempDir::new().unwrap();
    integra(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".integra.yaml"));
    assert!(dir.path().join(".integra.yaml").exists());

    integra(dir.path())
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"environment\":\"test\""));
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    integra(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("integra"));
}
