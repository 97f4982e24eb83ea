//! A single query row and its three-stage pipeline.
//!
//! ```text
//! fetch (HTTP, pagination) → extract (JSONPath) → aggregate
//! ```
//!
//! [`Query::execute`] never fails: every outcome, including a panic inside
//! the pipeline, becomes a [`ResultRow`].

use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures::FutureExt;
use pancake_core::Secrets;
use tracing::debug;

use crate::aggregate::{aggregate, Aggregated, Aggregation};
use crate::descriptor::QueryDescriptor;
use crate::error::QueryError;
use crate::extract::extract;
use crate::fetch::{fetch, DEFAULT_MAX_PAGES};
use crate::result::ResultRow;
use crate::transport::HttpTransport;

/// One query row, parsed once at construction.
///
/// An invalid row still produces a `Query`; the parse error is kept and
/// reported when the query is executed.
#[derive(Debug, Clone)]
pub struct Query {
    descriptor: Result<QueryDescriptor, QueryError>,
    max_pages: usize,
}

impl Query {
    /// Parse a raw row `(http_parameters_json, jsonpath_query, aggregation)`.
    pub fn new(fields: &[String], secrets: &Secrets) -> Self {
        let descriptor = QueryDescriptor::from_fields(fields, secrets);
        if let Err(e) = &descriptor {
            debug!(error = %e, "Query row is invalid");
        }
        Self {
            descriptor,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Cap the number of pages a paginated fetch may request.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn descriptor(&self) -> Result<&QueryDescriptor, &QueryError> {
        self.descriptor.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.descriptor.is_ok()
    }

    /// Run the pipeline and package the outcome.
    ///
    /// `query_start` and `query_end` are taken at pipeline entry and exit
    /// whatever the outcome.
    pub async fn execute(&self, transport: &dyn HttpTransport) -> ResultRow {
        let query_start = Utc::now();
        let outcome = AssertUnwindSafe(self.run(transport))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(QueryError::from_panic(panic)));
        let query_end = Utc::now();

        match outcome {
            Ok(value) => ResultRow::success(&value, query_start, query_end),
            Err(e) => {
                debug!(class = e.class(), code = %e.code(), error = %e, "Query failed");
                ResultRow::failure(&e, query_start, query_end)
            }
        }
    }

    async fn run(&self, transport: &dyn HttpTransport) -> Result<Aggregated, QueryError> {
        let descriptor = self.descriptor.as_ref().map_err(Clone::clone)?;

        let payload = fetch(descriptor, transport, self.max_pages).await?;
        let extracted = extract(&descriptor.jsonpath_query, payload)?;
        let op: Aggregation = descriptor.aggregation.parse()?;
        aggregate(op, extracted)
    }
}
