//! Scripted [`HttpTransport`] for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Answers from a fixed URL → (status, body) table and records every request.
/// Unknown URLs fail like a refused connection.
pub(crate) struct ScriptedTransport {
    routes: HashMap<String, (u16, Vec<u8>)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            routes: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_json(self, url: &str, status: u16, body: Value) -> Self {
        self.with_raw(url, status, &body.to_string())
    }

    pub(crate) fn with_raw(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(url.to_string(), (status, body.as_bytes().to_vec()));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let (status, body) = self
            .routes
            .get(&request.url)
            .cloned()
            .ok_or_else(|| TransportError::Connect(format!("connection refused: {}", request.url)))?;

        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Ok(HttpResponse { status, reason, body })
    }
}
