use std::collections::BTreeMap;

use pancake_core::Secrets;
use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::QueryError;
use crate::template::render_secrets;
use crate::transport::{default_headers, HttpMethod, HttpRequest};

/// Number of raw fields in a query row:
/// `(http_parameters_json, jsonpath_query, aggregation)`.
pub const ROW_FIELDS: usize = 3;

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Request half of a row's HTTP parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// Method as written in the row, upper-cased. Checked against GET/POST
    /// when the query runs.
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// Sent as a JSON body when not empty.
    pub data: Map<String, Value>,
    pub parameters: Map<String, Value>,
}

/// Where the payload and the next-page link live in a response document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSpec {
    /// `None` = the whole document is the payload.
    pub data_path: Option<String>,
    /// `None` = single page.
    pub next_path: Option<String>,
}

/// A parsed, validated query row. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub request: RequestSpec,
    pub response: ResponseSpec,
    /// Applied to the fetched payload; empty = identity.
    pub jsonpath_query: String,
    /// Upper-cased operator token; empty = identity.
    pub aggregation: String,
}

#[derive(Deserialize)]
struct RawParameters {
    request: RawRequest,
    #[serde(default)]
    response: Value,
}

#[derive(Deserialize)]
struct RawRequest {
    method: String,
    url: String,
    headers: Option<BTreeMap<String, String>>,
    data: Option<Map<String, Value>>,
    parameters: Option<Map<String, Value>>,
}

impl QueryDescriptor {
    /// Parse one raw row.
    ///
    /// The HTTP parameters blob is parsed as JSON, then secrets are
    /// substituted into its string values. Header names and values must be
    /// valid HTTP. Missing `headers`, `data` and `parameters` default to
    /// empty mappings; a missing or malformed `response` object means no data
    /// path and no next path. Anything else wrong with the row is
    /// [`QueryError::InvalidQuery`].
    pub fn from_fields(fields: &[String], secrets: &Secrets) -> Result<Self, QueryError> {
        let [http_parameters, jsonpath_query, aggregation] = fields else {
            return Err(QueryError::InvalidQuery(format!(
                "expected {ROW_FIELDS} fields, got {}",
                fields.len()
            )));
        };

        let parsed: Value = serde_json::from_str(http_parameters)
            .map_err(|e| QueryError::InvalidQuery(format!("invalid HTTP parameters: {e}")))?;
        let rendered = render_secrets(parsed, secrets)?;
        let raw: RawParameters = serde_json::from_value(rendered)
            .map_err(|e| QueryError::InvalidQuery(format!("invalid HTTP parameters: {e}")))?;

        let method = raw.request.method.trim().to_ascii_uppercase();
        if method.is_empty() {
            return Err(QueryError::InvalidQuery("request.method is empty".into()));
        }
        let url = raw.request.url.trim().to_string();
        if url.is_empty() {
            return Err(QueryError::InvalidQuery("request.url is empty".into()));
        }

        let headers = raw.request.headers.unwrap_or_default();
        validate_headers(&headers)?;

        Ok(Self {
            request: RequestSpec {
                method,
                url,
                headers,
                data: raw.request.data.unwrap_or_default(),
                parameters: raw.request.parameters.unwrap_or_default(),
            },
            response: ResponseSpec::from_value(&raw.response),
            jsonpath_query: jsonpath_query.trim().to_string(),
            aggregation: aggregation.trim().to_ascii_uppercase(),
        })
    }

    /// First-page request: default headers overridden by the row's headers
    /// (case-insensitive), row parameters as query string, row data as body.
    pub fn first_request(&self, method: HttpMethod) -> HttpRequest {
        let mut headers = default_headers();
        for (key, value) in &self.request.headers {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
            headers.push((key.clone(), value.clone()));
        }

        let query = self
            .request
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), value_to_param(v)))
            .collect();

        let body = if self.request.data.is_empty() {
            None
        } else {
            Some(Value::Object(self.request.data.clone()))
        };

        HttpRequest {
            method,
            url: self.request.url.clone(),
            headers,
            query,
            body,
        }
    }
}

impl ResponseSpec {
    fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let path = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Self {
            data_path: path("data_path"),
            next_path: path("next_path"),
        }
    }
}

fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), QueryError> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| QueryError::InvalidQuery(format!("invalid header name `{name}`")))?;
        HeaderValue::from_str(value)
            .map_err(|_| QueryError::InvalidQuery(format!("invalid value for header `{name}`")))?;
    }
    Ok(())
}

/// Query-string form of a parameter value. Strings go verbatim, everything
/// else as its JSON text.
fn value_to_param(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
