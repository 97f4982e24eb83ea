//! Batch execution of query rows.
//!
//! One [`Query`] per input row, executed independently. A failing row is
//! recorded in its [`ResultRow`] and the batch moves on; output order always
//! matches input order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use pancake_core::Secrets;
use tracing::{info, warn};

use crate::fetch::DEFAULT_MAX_PAGES;
use crate::query::Query;
use crate::result::ResultRow;
use crate::transport::HttpTransport;

/// Executes batches of raw query rows against a shared transport.
pub struct Runner {
    transport: Arc<dyn HttpTransport>,
    concurrency: usize,
    max_pages: usize,
}

impl Runner {
    /// Sequential runner: one row at a time, in input order.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            concurrency: 1,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Execute up to `concurrency` rows at once. Results keep input order and
    /// pagination inside a row stays sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Run every row and return exactly one [`ResultRow`] per input row.
    pub async fn run(&self, rows: &[Vec<String>], secrets: &Secrets) -> Vec<ResultRow> {
        let started = Instant::now();
        info!(rows = rows.len(), concurrency = self.concurrency, "Batch started");

        let queries: Vec<Query> = rows
            .iter()
            .map(|fields| Query::new(fields, secrets).with_max_pages(self.max_pages))
            .collect();

        let transport = self.transport.as_ref();
        let results: Vec<ResultRow> = stream::iter(queries.iter().enumerate())
            .map(|(index, query)| async move {
                let row = query.execute(transport).await;
                if !row.is_success() {
                    warn!(
                        row = index + 1,
                        code = %row.error_code,
                        error = %row.error_message,
                        "Query row failed"
                    );
                }
                row
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let summary = BatchSummary::from_rows(&results, started.elapsed());
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Batch finished"
        );

        results
    }
}

/// Counts for one finished batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn from_rows(rows: &[ResultRow], elapsed: Duration) -> Self {
        let succeeded = rows.iter().filter(|r| r.is_success()).count();
        Self {
            total: rows.len(),
            succeeded,
            failed: rows.len() - succeeded,
            elapsed,
        }
    }
}
