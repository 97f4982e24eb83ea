//! Query execution engine.
//!
//! Each row of a query table describes an HTTP request, a JSONPath into the
//! returned JSON and an optional aggregation. This crate provides:
//! - [`Query`]: parses one row and runs fetch → extract → aggregate
//! - [`Runner`]: executes a batch of rows, one [`ResultRow`] per row, in order
//! - [`QueryError`]: the closed error taxonomy written to `error_code`
//! - [`HttpTransport`]: the HTTP seam, with a reqwest implementation

pub mod aggregate;
pub mod descriptor;
pub mod error;
mod extract;
mod fetch;
pub mod query;
pub mod result;
pub mod runner;
mod template;
pub mod transport;

#[cfg(test)]
mod testing;

pub use aggregate::{Aggregated, Aggregation};
pub use descriptor::{QueryDescriptor, RequestSpec, ResponseSpec, ROW_FIELDS};
pub use error::{QueryError, TransportError};
pub use fetch::DEFAULT_MAX_PAGES;
pub use query::Query;
pub use result::{format_timestamp, ResultRow, ResultTable, HEADER, SUCCESS_CODE};
pub use runner::{BatchSummary, Runner};
pub use transport::{
    default_headers, HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
    USER_AGENT,
};
