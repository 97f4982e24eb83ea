//! HTTP transport seam.
//!
//! The pipeline only talks to [`HttpTransport`]; [`ReqwestTransport`] is the
//! production implementation, tests substitute scripted fakes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{QueryError, TransportError};

/// `User-Agent` sent unless the row overrides it.
pub const USER_AGENT: &str = concat!("supreme-pancake/", env!("CARGO_PKG_VERSION"));

/// Headers sent with every request unless the row overrides them.
pub fn default_headers() -> Vec<(String, String)> {
    vec![
        ("Accept-Encoding".to_string(), "gzip".to_string()),
        ("accept".to_string(), "application/json".to_string()),
        ("User-Agent".to_string(), USER_AGENT.to_string()),
    ]
}

/// The only methods a query row may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            _ => Err(QueryError::UnsupportedHttpMethod(s.to_string())),
        }
    }
}

/// A fully resolved request for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Defaults merged with row headers, in send order.
    pub headers: Vec<(String, String)>,
    /// Query-string parameters appended to `url`.
    pub query: Vec<(String, String)>,
    /// JSON body, sent when present.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Request for a follow-up page. The next URL carries its own cursor,
    /// so the row's query parameters are not re-applied.
    pub fn follow(&self, url: String) -> Self {
        Self {
            method: self.method,
            url,
            headers: self.headers.clone(),
            query: Vec::new(),
            body: self.body.clone(),
        }
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response as seen by the fetch stage.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase, e.g. "Not Found".
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one HTTP request. Non-2xx statuses are not errors at this layer.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the given per-request timeout. Gzip responses are
    /// decompressed transparently.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: reason_phrase(status),
            body: body.to_vec(),
        })
    }
}

/// Standard reason phrase, or `HTTP <code>` for statuses without one.
fn reason_phrase(status: reqwest::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason.to_string(),
        None => format!("HTTP {}", status.as_u16()),
    }
}
