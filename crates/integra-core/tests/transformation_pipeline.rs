//! End-to-end transformation pipeline tests


use integra_core::store::JsonFileBackend;
use integra_core::transformation::{functions, Transformer, TransformerConfig};
use integra_core::{Databases, Error, Params};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use test_support::*;

fn sprint_pipeline() -> TransformerConfig {
    serde_json::from_value(json!({
        "transformation-sets": {
            "sprint": {
                "db": {"src.db": "raw", "dest.db": "work"},
                "transformations": {
                    "open_issues": {
                        "class": "etl.Col2XTransformation",
                        "cfg": {
                            "src.db.load": {"src": "issues"},
                            "transform": {"func": "filter_set", "params": {"where": "status != 'Done'"}},
                            "dest.db.cleanup": {"target": "open_issues"},
                            "dest.db.save": {"dest": "open_issues"}
                        }
                    },
                    "with_sprint": {
                        "class": "MultiColDoc2XTransformation",
                        "cfg": {
                            "src.db.load": {"src.cols": ["issues"], "src.docs": ["sprint"]},
                            "transform": {
                                "func": "update_col",
                                "params": {
                                    "target": "issues",
                                    "update": [
                                        {"src.type": "doc", "src.col": "sprint", "src.field": "id", "dest.field": "sprint"}
                                    ]
                                }
                            },
                            "dest.db.cleanup": {"target": "planned"},
                            "dest.db.save": {"dest": "planned"}
                        }
                    },
                    "labels": {
                        "class": "col",
                        "cfg": {
                            "src.db.load": {"src": "issue_labels"},
                            "transform": {
                                "func": "group_singles2array",
                                "params": {"field.key": "key", "field.array": "labels", "field.single": "label"}
                            },
                            "dest.db.cleanup": {"target": "labels"},
                            "dest.db.save": {"dest": "labels"}
                        }
                    }
                }
            }
        }
    }))
    .unwrap()
}

fn seed_raw(databases: &Databases) {
    seed(
        databases,
        "raw",
        "issues",
        json!([
            {"key": "A-1", "status": "Open"},
            {"key": "A-2", "status": "Done"},
            {"key": "A-3", "status": "In Progress"}
        ]),
    );
    seed(databases, "raw", "sprint", json!({"id": 12, "name": "Sprint 12"}));
    seed(
        databases,
        "raw",
        "issue_labels",
        json!([
            {"key": "A-1", "label": "ui"},
            {"key": "A-1", "label": "auth"},
            {"key": "A-3", "label": "api"}
        ]),
    );
}

#[test]
fn test_pipeline_stages() {
    let databases = memory_databases(&["raw", "work"]);
    seed_raw(&databases);

    let performed = Transformer::new(sprint_pipeline(), &databases).perform().unwrap();
    assert_eq!(performed, 3);

    let open: Vec<Value> = read_all(&databases, "work", "open_issues");
    assert_eq!(open.len(), 2);
    assert!(open.iter().all(|issue| issue["status"] != json!("Done")));

    let planned = read_all(&databases, "work", "planned");
    assert!(planned.iter().all(|issue| issue["sprint"] == json!(12)));

    assert_eq!(
        read_all(&databases, "work", "labels"),
        vec![
            json!({"key": "A-1", "labels": ["ui", "auth"]}),
            json!({"key": "A-3", "labels": ["api"]})
        ]
    );
}

#[test]
fn test_rerun_is_idempotent_on_file_store() {
    let dir = TempDir::new().unwrap();
    let mut databases = memory_databases(&["raw"]);
    databases.register("work", Arc::new(JsonFileBackend::open(dir.path()).unwrap()));
    seed_raw(&databases);

    Transformer::new(sprint_pipeline(), &databases).perform().unwrap();
    let first = (
        read_all(&databases, "work", "open_issues"),
        read_all(&databases, "work", "planned"),
        read_all(&databases, "work", "labels"),
    );

    Transformer::new(sprint_pipeline(), &databases).perform().unwrap();
    let second = (
        read_all(&databases, "work", "open_issues"),
        read_all(&databases, "work", "planned"),
        read_all(&databases, "work", "labels"),
    );

    assert_eq!(first, second);
    assert!(dir.path().join("labels.json").exists());
}

#[test]
fn test_failure_keeps_earlier_writes() {
    let databases = memory_databases(&["raw", "work"]);
    seed_raw(&databases);
    let config: TransformerConfig = serde_json::from_value(json!({
        "transformation-sets": {
            "broken": {
                "db": {"src.db": "raw", "dest.db": "work"},
                "transformations": {
                    "keys": {
                        "class": "col",
                        "cfg": {
                            "src.db.load": {"src": "issues"},
                            "transform": {"func": "copy", "params": {"fields": ["key"]}},
                            "dest.db.cleanup": {"target": "keys"},
                            "dest.db.save": {"dest": "keys"}
                        }
                    },
                    "rename": {
                        "class": "col",
                        "cfg": {
                            "src.db.load": {"src": "issues"},
                            "transform": {"func": "rename_fields", "params": {"rename": [{"src.field": "missing", "dest.field": "x"}]}},
                            "dest.db.cleanup": {"target": "renamed"},
                            "dest.db.save": {"dest": "renamed"}
                        }
                    }
                }
            }
        }
    }))
    .unwrap();

    let err = Transformer::new(config, &databases).perform().unwrap_err();
    assert!(matches!(err, Error::MissingRequiredField { .. }));
    assert_eq!(read_all(&databases, "work", "keys").len(), 3);
    assert!(read_all(&databases, "work", "renamed").is_empty());
}

#[test]
fn test_copy_projects_record() {
    let params: Params = json!({"fields": ["a", "b"]}).as_object().cloned().unwrap();
    let copied = functions::copy(json!({"a": 1, "b": 2, "c": 3}), &params).unwrap();
    assert_eq!(copied, json!({"a": 1, "b": 2}));
}
