//! Fetch stage: one request, or a cursor-following loop when the row names a
//! next-page path.

use std::collections::HashSet;

use serde_json::Value;
use serde_json_path::JsonPath;
use tracing::{debug, warn};

use crate::descriptor::QueryDescriptor;
use crate::error::QueryError;
use crate::extract::{compile, next_url, select_payload};
use crate::transport::{HttpMethod, HttpRequest, HttpTransport};

/// Default cap on pages fetched by one query.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Fetch the payload described by `descriptor`.
///
/// Without a next-page path the result is the data selected from the single
/// response. With one, the result is an array holding the data selected from
/// each page, in page order. Pagination stops when no next URL is found, when
/// the next URL was already fetched, or after `max_pages` pages.
pub(crate) async fn fetch(
    descriptor: &QueryDescriptor,
    transport: &dyn HttpTransport,
    max_pages: usize,
) -> Result<Value, QueryError> {
    let method: HttpMethod = descriptor.request.method.parse()?;
    let data_path = descriptor.response.data_path.as_deref().map(compile).transpose()?;
    let next_path = descriptor.response.next_path.as_deref().map(compile).transpose()?;

    let first = descriptor.first_request(method);

    match next_path {
        None => {
            let doc = fetch_document(transport, &first).await?;
            Ok(page_data(data_path.as_ref(), doc))
        }
        Some(next_path) => {
            paginate(transport, first, data_path.as_ref(), &next_path, max_pages.max(1)).await
        }
    }
}

async fn paginate(
    transport: &dyn HttpTransport,
    first: HttpRequest,
    data_path: Option<&JsonPath>,
    next_path: &JsonPath,
    max_pages: usize,
) -> Result<Value, QueryError> {
    let mut pages = Vec::new();
    let mut visited = HashSet::new();
    let mut request = first;

    loop {
        visited.insert(request.url.clone());
        let doc = fetch_document(transport, &request).await?;
        let next = next_url(next_path, &doc);
        pages.push(page_data(data_path, doc));

        let Some(next) = next else {
            break;
        };
        if visited.contains(&next) {
            warn!(url = %next, pages = pages.len(), "Next-page URL already fetched, stopping pagination");
            break;
        }
        if pages.len() >= max_pages {
            warn!(max_pages, url = %next, "Page limit reached, stopping pagination");
            break;
        }
        request = request.follow(next);
    }

    debug!(pages = pages.len(), "Pagination finished");
    Ok(Value::Array(pages))
}

fn page_data(data_path: Option<&JsonPath>, doc: Value) -> Value {
    match data_path {
        Some(path) => select_payload(path, &doc),
        None => doc,
    }
}

/// Send one request and parse the body as JSON.
async fn fetch_document(
    transport: &dyn HttpTransport,
    request: &HttpRequest,
) -> Result<Value, QueryError> {
    debug!(method = %request.method, url = %request.url, "Fetching page");

    let response = transport.send(request).await?;

    if !response.is_success() {
        warn!(
            url = %request.url,
            status = response.status,
            reason = %response.reason,
            "Request returned non-2xx status"
        );
        return Err(QueryError::Http {
            status: response.status,
            reason: response.reason,
        });
    }

    serde_json::from_slice(&response.body).map_err(|e| {
        QueryError::InvalidQuery(format!("response from {} is not valid JSON: {e}", request.url))
    })
}
