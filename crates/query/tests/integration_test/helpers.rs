//! In-memory transport and row builders shared by the integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pancake_query::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use serde_json::Value;

/// Serves canned responses by URL and logs every request it receives.
#[derive(Default)]
pub struct FakeApi {
    pages: HashMap<String, (u16, String, String)>,
    log: Mutex<Vec<HttpRequest>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(self, url: &str, body: Value) -> Self {
        self.respond(url, 200, "OK", &body.to_string())
    }

    pub fn respond(mut self, url: &str, status: u16, reason: &str, body: &str) -> Self {
        self.pages
            .insert(url.to_string(), (status, reason.to_string(), body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeApi {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.log.lock().unwrap().push(request.clone());
        match self.pages.get(&request.url) {
            Some((status, reason, body)) => Ok(HttpResponse {
                status: *status,
                reason: reason.clone(),
                body: body.clone().into_bytes(),
            }),
            None => Err(TransportError::Connect(format!(
                "dns error: failed to lookup address for {}",
                request.url
            ))),
        }
    }
}

/// A raw row from an HTTP-parameters value, a JSONPath and an operator.
pub fn row(params: Value, path: &str, aggregation: &str) -> Vec<String> {
    vec![params.to_string(), path.to_string(), aggregation.to_string()]
}
