//! JSONPath helpers for the fetch and extraction stages.
//!
//! Expressions that do not start with `$` are taken relative to the root:
//! `items[*].id` means `$.items[*].id` and `[0]` means `$[0]`.

use std::borrow::Cow;

use serde_json::Value;
use serde_json_path::JsonPath;

use crate::error::QueryError;

/// Compile a JSONPath expression.
pub(crate) fn compile(expr: &str) -> Result<JsonPath, QueryError> {
    let normalized = normalize(expr);
    JsonPath::parse(&normalized)
        .map_err(|e| QueryError::JsonPathSyntax(format!("invalid JSONPath `{expr}`: {e}")))
}

fn normalize(expr: &str) -> Cow<'_, str> {
    let expr = expr.trim();
    if expr.starts_with('$') {
        Cow::Borrowed(expr)
    } else if expr.starts_with('[') {
        Cow::Owned(format!("${expr}"))
    } else {
        Cow::Owned(format!("$.{expr}"))
    }
}

/// Extraction stage: every node matched by `query`, as a JSON array.
/// An empty query returns the payload unchanged.
pub(crate) fn extract(query: &str, payload: Value) -> Result<Value, QueryError> {
    if query.trim().is_empty() {
        return Ok(payload);
    }
    let path = compile(query)?;
    let nodes = path.query(&payload).all().into_iter().cloned().collect();
    Ok(Value::Array(nodes))
}

/// Payload selected from one response document: no match is `null`, a single
/// match is that node, several matches are collected into an array.
pub(crate) fn select_payload(path: &JsonPath, doc: &Value) -> Value {
    let mut nodes: Vec<Value> = path.query(doc).all().into_iter().cloned().collect();
    match nodes.len() {
        0 => Value::Null,
        1 => nodes.swap_remove(0),
        _ => Value::Array(nodes),
    }
}

/// Next-page URL: the first match, if it is a non-empty string.
pub(crate) fn next_url(path: &JsonPath, doc: &Value) -> Option<String> {
    path.query(doc)
        .first()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
