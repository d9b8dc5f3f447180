//! Request orchestration tests against a scripted transport


use integra_core::http::Method;
use integra_core::integration::{
    export, import, ExportConfig, ExportKind, Exporter, ImportConfig, ImportKind, Importer,
    RequestTemplate,
};
use integra_core::Error;
use serde_json::{json, Value};
use tempfile::TempDir;
use test_support::*;

fn page(start: i64, keys: &[&str]) -> Value {
    json!({
        "startAt": start,
        "maxResults": 50,
        "total": 120,
        "issues": keys.iter().map(|k| json!({"key": k, "fields": {"summary": format!("Issue {}", k)}})).collect::<Vec<_>>()
    })
}

fn list_template() -> RequestTemplate {
    serde_json::from_value(json!({
        "request": {
            "url": "https://tracker.example.com/rest/api/2/search",
            "data": {"jql": "project = PRJ", "startAt": 0, "maxResults": 50}
        },
        "response": {
            "content-root": "issues",
            "issues": {
                "type": "array",
                "fields": {
                    "issue": {
                        "type": "object",
                        "explicit": true,
                        "fields": {
                            "key": {"key": "key", "type": "string"},
                            "fields": {
                                "key": "fields",
                                "type": "object",
                                "fields": {"summary": {"key": "summary", "type": "string"}}
                            }
                        }
                    }
                }
            }
        }
    }))
    .unwrap()
}

#[test]
fn test_list_import_follows_pagination() {
    let transport = ScriptedTransport::new(vec![
        page(0, &["A-1", "A-2"]),
        page(50, &["A-3"]),
        page(100, &["A-4"]),
    ]);

    let result = import(&list_template(), ImportKind::List, &transport, &credentials()).unwrap();

    let starts: Vec<Value> = transport
        .sent()
        .iter()
        .map(|r| r.payload.as_ref().unwrap()["startAt"].clone())
        .collect();
    assert_eq!(starts, vec![json!(0), json!(50), json!(100)]);
    assert!(transport.sent().iter().all(|r| r.method == Method::GET));

    let items = result.as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[2], json!({"key": "A-3", "summary": "Issue A-3"}));
}

#[test]
fn test_list_without_total_is_one_page() {
    let transport = ScriptedTransport::new(vec![json!({"issues": [{"key": "B-1", "fields": {"summary": "s"}}]})]);
    let result = import(&list_template(), ImportKind::List, &transport, &credentials()).unwrap();
    assert_eq!(result.as_array().unwrap().len(), 1);
    assert_eq!(transport.sent().len(), 1);
}

#[test]
fn test_single_object_import() {
    let template: RequestTemplate = serde_json::from_value(json!({
        "request": {"url": "https://tracker.example.com/rest/agile/1.0/sprint/12"},
        "response": {
            "type": "object",
            "fields": {
                "id": {"key": "id", "type": "int"},
                "name": {"key": "name", "type": "string"},
                "start": {"key": "startDate", "ext_id": "start", "type": "date", "optional": true}
            }
        }
    }))
    .unwrap();
    let transport = ScriptedTransport::new(vec![json!({"id": 12, "name": "Sprint 12", "state": "active"})]);

    let result = import(&template, ImportKind::SingleObject, &transport, &credentials()).unwrap();
    assert_eq!(result, json!({"id": 12, "name": "Sprint 12", "start": null}));
}

#[test]
fn test_export_surfaces_transport_errors() {
    let template: RequestTemplate = serde_json::from_value(json!({
        "request": {"url": "https://tracker.example.com/rest/api/2/issue", "data": {"fields": {}}}
    }))
    .unwrap();
    let transport = ScriptedTransport::default();
    transport.push_failure("https://tracker.example.com/rest/api/2/issue", 400, r#"{"errors":{"summary":"required"}}"#);

    let err = export(&template, ExportKind::CreateEntity, &transport, &credentials()).unwrap_err();
    match err {
        Error::Transport { status_code, message, .. } => {
            assert_eq!(status_code, Some(400));
            assert!(message.contains("summary"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(transport.sent().len(), 1);
}

#[test]
fn test_importer_replaces_destination() {
    let dir = TempDir::new().unwrap();
    let template = write_json(dir.path(), "search.json", &serde_json::to_value(list_template()).unwrap());
    let databases = memory_databases(&["scrum"]);
    seed(&databases, "scrum", "backlog", json!([{"key": "OLD-1"}]));

    let config: ImportConfig = serde_json::from_value(json!({
        "db": "scrum",
        "requests": {"backlog": {"cfg": template, "type": "list", "dest": "backlog"}}
    }))
    .unwrap();
    let transport = ScriptedTransport::new(vec![json!({"issues": [{"key": "A-1", "fields": {"summary": "s"}}]})]);

    Importer::new(config, &databases, &transport, &credentials()).perform().unwrap();
    assert_eq!(
        read_all(&databases, "scrum", "backlog"),
        vec![json!({"key": "A-1", "summary": "s"})]
    );
}

#[test]
fn test_exporter_substitutes_and_updates_source() {
    let dir = TempDir::new().unwrap();
    let template = write_text(
        dir.path(),
        "create.json",
        r#"{"request": {"url": "$base/rest/api/2/issue", "data": {"fields": {"project": {"key": "$project"}, "summary": "$summary", "labels": $labels}}}}"#,
    );
    let databases = memory_databases(&["scrum"]);
    seed(
        &databases,
        "scrum",
        "drafts",
        json!([
            {"title": "First", "tags": ["a"]},
            {"title": "Second", "tags": []}
        ]),
    );

    let config: ExportConfig = serde_json::from_value(json!({
        "db": "scrum",
        "mapping": {"base": "https://tracker.example.com"},
        "requests": {
            "create": {
                "cfg": template,
                "type": "create_entity",
                "src.collection": "drafts",
                "static_mapping": {"project": "PRJ"},
                "dynamic_mapping": {"summary": "title", "labels": "tags"},
                "callback.update_src": true
            }
        }
    }))
    .unwrap();
    let transport = ScriptedTransport::new(vec![
        json!({"id": "100", "key": "PRJ-1"}),
        json!({"id": "101", "key": "PRJ-2"}),
    ]);

    Exporter::new(config, &databases, &transport, &credentials()).perform().unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].method, Method::POST);
    assert_eq!(sent[0].url, "https://tracker.example.com/rest/api/2/issue");
    assert_eq!(
        sent[0].payload,
        Some(json!({"fields": {"project": {"key": "PRJ"}, "summary": "First", "labels": ["a"]}}))
    );

    let drafts = read_all(&databases, "scrum", "drafts");
    assert_eq!(drafts[0]["key"], json!("PRJ-1"));
    assert_eq!(drafts[1]["key"], json!("PRJ-2"));
}

#[test]
fn test_exporter_updates_one_matching_record() {
    let dir = TempDir::new().unwrap();
    let template = write_text(
        dir.path(),
        "create.json",
        r#"{"request": {"url": "https://tracker.example.com/rest/api/2/issue", "data": {"fields": {"summary": "$summary"}}}}"#,
    );
    let databases = memory_databases(&["scrum"]);
    seed(
        &databases,
        "scrum",
        "drafts",
        json!([
            {"title": "Twin"},
            {"title": "Twin"}
        ]),
    );

    let config: ExportConfig = serde_json::from_value(json!({
        "db": "scrum",
        "requests": {
            "create": {
                "cfg": template,
                "type": "create_entity",
                "src.collection": "drafts",
                "dynamic_mapping": {"summary": "title"},
                "callback.update_src": true
            }
        }
    }))
    .unwrap();
    let transport = ScriptedTransport::new(vec![json!({"key": "PRJ-1"}), json!({"key": "PRJ-2"})]);

    Exporter::new(config, &databases, &transport, &credentials()).perform().unwrap();

    let drafts = read_all(&databases, "scrum", "drafts");
    assert_eq!(drafts.len(), 2);
    let keys: Vec<&Value> = drafts.iter().map(|draft| &draft["key"]).collect();
    assert!(keys.contains(&&json!("PRJ-1")));
    assert!(keys.contains(&&json!("PRJ-2")));
}
