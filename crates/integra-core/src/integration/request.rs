//! Import and export requests against a remote API
//!
//! An import issues GET requests and parses the answers through the field
//! mapper; list imports follow `startAt`/`maxResults`/`total` pagination.
//! An export issues exactly one POST, PUT or DELETE.
//!
//! Copyright (c) 2025 Integra Team
//! Licensed under the Apache-2.0 license

use crate::converter::convert;
use crate::http::{Credentials, Method, Transport};
use crate::mapper::{self, FieldDescriptor, Target};
use crate::types::FieldType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

/// Response key naming the descriptor applied to the paginated content
pub const CONTENT_ROOT: &str = "content-root";

const START_AT: &str = "startAt";
const MAX_RESULTS: &str = "maxResults";
const TOTAL: &str = "total";

/// Request configuration after parameter substitution
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestTemplate {
    pub request: RequestSpec,

    /// Response descriptor(s); required for imports
    #[serde(default)]
    pub response: Option<Value>,
}

/// Target url and optional payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestSpec {
    pub url: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Shape of an import answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// One record parsed with the whole `response` descriptor
    SingleObject,
    /// Paginated list of records
    List,
}

/// Kind of export call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    CreateEntity,
    CreateRelation,
    SetFieldValue,
    DeleteEntity,
}

impl ExportKind {
    /// HTTP method used for this kind
    pub fn method(&self) -> Method {
        match self {
            ExportKind::CreateEntity | ExportKind::CreateRelation => Method::POST,
            ExportKind::SetFieldValue => Method::PUT,
            ExportKind::DeleteEntity => Method::DELETE,
        }
    }
}

/// Lifecycle of a request session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    RequestSent,
    ResponseParsed,
    Done,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Idle => "idle",
            RequestState::RequestSent => "request_sent",
            RequestState::ResponseParsed => "response_parsed",
            RequestState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Pagination position read from a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub start: i64,
    pub page_size: i64,
    pub total: i64,
}

impl PageCursor {
    /// Cursor of a response, `None` when the response carries no `total`
    pub fn from_response(response: &Value) -> Result<Option<Self>> {
        if response.get(TOTAL).is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            start: page_field(response, START_AT)?,
            page_size: page_field(response, MAX_RESULTS)?,
            total: page_field(response, TOTAL)?,
        }))
    }

    /// Start of the next page, `None` when this was the last one
    pub fn next_start(&self) -> Option<i64> {
        if self.page_size <= 0 {
            return None;
        }
        let next = self.start + self.page_size;
        (next < self.total).then_some(next)
    }
}

fn page_field(response: &Value, field: &str) -> Result<i64> {
    let raw = response
        .get(field)
        .ok_or_else(|| Error::missing(field, Some("paginated response".to_string())))?;
    // A zero start reads as falsy and converts to null
    match convert(raw, FieldType::Int)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::unsupported(format!("'{}' is out of range", field))),
        _ => Ok(0),
    }
}

/// Tracks the state of one import or export call
#[derive(Debug)]
struct Session<'a> {
    url: &'a str,
    state: RequestState,
}

impl<'a> Session<'a> {
    fn new(url: &'a str) -> Self {
        Self {
            url,
            state: RequestState::Idle,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug!(url = self.url, from = %self.state, to = %next, "Request state");
        self.state = next;
    }
}

/// Run an import and return a record (single object) or a list of values
pub fn import(
    template: &RequestTemplate,
    kind: ImportKind,
    transport: &dyn Transport,
    credentials: &Credentials,
) -> Result<Value> {
    let response = template
        .response
        .as_ref()
        .ok_or_else(|| Error::config("Import request configuration has no 'response'"))?;
    match kind {
        ImportKind::SingleObject => import_single(template, response, transport, credentials),
        ImportKind::List => import_list(template, response, transport, credentials),
    }
}

fn import_single(
    template: &RequestTemplate,
    response_cfg: &Value,
    transport: &dyn Transport,
    credentials: &Credentials,
) -> Result<Value> {
    let descriptor = FieldDescriptor::from_value(response_cfg.clone())?;
    let url = template.request.url.as_str();
    let mut session = Session::new(url);

    info!(url, data = ?template.request.data, "Requesting single object");
    session.advance(RequestState::RequestSent);
    let response = transport.send(Method::GET, url, template.request.data.as_ref(), credentials)?;

    let record = mapper::extract_record(&response, &descriptor)?;
    session.advance(RequestState::ResponseParsed);
    session.advance(RequestState::Done);
    Ok(Value::Object(record))
}

fn import_list(
    template: &RequestTemplate,
    response_cfg: &Value,
    transport: &dyn Transport,
    credentials: &Credentials,
) -> Result<Value> {
    let response_map = response_cfg
        .as_object()
        .ok_or_else(|| Error::config("List import 'response' must be an object"))?;
    let content_root = response_map.get(CONTENT_ROOT).and_then(Value::as_str);

    let descriptors: Vec<FieldDescriptor> = match content_root {
        Some(root) => {
            let cfg = response_map.get(root).ok_or_else(|| {
                Error::config(format!("No descriptor configured for content root '{}'", root))
            })?;
            vec![FieldDescriptor::from_value(cfg.clone())?]
        }
        None => response_map
            .iter()
            .filter(|(name, _)| name.as_str() != CONTENT_ROOT)
            .map(|(_, cfg)| FieldDescriptor::from_value(cfg.clone()))
            .collect::<Result<_>>()?,
    };

    let url = template.request.url.as_str();
    let mut data = template.request.data.clone();
    let mut session = Session::new(url);
    let mut results = Vec::new();

    loop {
        info!(url, data = ?data, "Requesting page");
        session.advance(RequestState::RequestSent);
        let response = transport.send(Method::GET, url, data.as_ref(), credentials)?;

        let content = match content_root {
            Some(root) => response
                .get(root)
                .ok_or_else(|| Error::missing(root, Some("list response".to_string())))?,
            None => &response,
        };
        let before = results.len();
        for descriptor in &descriptors {
            mapper::parse(content, descriptor, Target::List(&mut results), false)?;
        }
        session.advance(RequestState::ResponseParsed);
        debug!(url, parsed = results.len() - before, "Page parsed");

        let next = PageCursor::from_response(&response)?.and_then(|cursor| cursor.next_start());
        match next {
            Some(start) => set_start_at(&mut data, start)?,
            None => break,
        }
    }

    session.advance(RequestState::Done);
    info!(url, items = results.len(), "Import finished");
    Ok(Value::Array(results))
}

fn set_start_at(data: &mut Option<Value>, start: i64) -> Result<()> {
    let payload = data.get_or_insert_with(|| Value::Object(Default::default()));
    let params = payload
        .as_object_mut()
        .ok_or_else(|| Error::config("Paginated request 'data' must be an object"))?;
    params.insert(START_AT.to_string(), Value::from(start));
    Ok(())
}

/// Run one export call; only `create_entity` returns the decoded answer
pub fn export(
    template: &RequestTemplate,
    kind: ExportKind,
    transport: &dyn Transport,
    credentials: &Credentials,
) -> Result<Value> {
    let url = template.request.url.as_str();
    let mut session = Session::new(url);

    info!(url, kind = ?kind, data = ?template.request.data, "Export request");
    session.advance(RequestState::RequestSent);
    let response = transport.send(kind.method(), url, template.request.data.as_ref(), credentials)?;
    session.advance(RequestState::ResponseParsed);
    session.advance(RequestState::Done);

    Ok(match kind {
        ExportKind::CreateEntity => response,
        _ => Value::Null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_cursor() {
        let cursor = PageCursor::from_response(&json!({"startAt": 0, "maxResults": 50, "total": 120}))
            .unwrap()
            .unwrap();
        assert_eq!(cursor.next_start(), Some(50));

        let last = PageCursor { start: 100, page_size: 50, total: 120 };
        assert_eq!(last.next_start(), None);

        let stuck = PageCursor { start: 0, page_size: 0, total: 120 };
        assert_eq!(stuck.next_start(), None);

        assert_eq!(PageCursor::from_response(&json!({"issues": []})).unwrap(), None);
        assert!(PageCursor::from_response(&json!({"total": 3})).is_err());
    }

    #[test]
    fn test_export_methods() {
        assert_eq!(ExportKind::CreateEntity.method(), Method::POST);
        assert_eq!(ExportKind::CreateRelation.method(), Method::POST);
        assert_eq!(ExportKind::SetFieldValue.method(), Method::PUT);
        assert_eq!(ExportKind::DeleteEntity.method(), Method::DELETE);
    }

    #[test]
    fn test_kind_names() {
        let kind: ImportKind = serde_json::from_str("\"single_object\"").unwrap();
        assert_eq!(kind, ImportKind::SingleObject);
        let kind: ExportKind = serde_json::from_str("\"set_field_value\"").unwrap();
        assert_eq!(kind, ExportKind::SetFieldValue);
    }

    #[test]
    fn test_set_start_at() {
        let mut data = Some(json!({"jql": "x", "startAt": 0}));
        set_start_at(&mut data, 50).unwrap();
        assert_eq!(data, Some(json!({"jql": "x", "startAt": 50})));

        let mut empty = None;
        set_start_at(&mut empty, 10).unwrap();
        assert_eq!(empty, Some(json!({"startAt": 10})));
    }
}
