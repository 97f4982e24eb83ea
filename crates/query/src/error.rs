//! Error taxonomy for query execution.
//!
//! Every pipeline stage returns `Result<_, QueryError>`. The enum is closed:
//! each variant maps to a stable code written to the `error_code` column.
//! [`QueryError::Unknown`] is the fallback arm for anything not otherwise
//! classified (network failures, panics) and keeps the original text.

use std::any::Any;

/// Classified failure of a single query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("{0}")]
    Unknown(String),

    /// Row malformed, or response body not parseable as JSON.
    #[error("{0}")]
    InvalidQuery(String),

    #[error("invalid or unsupported HTTP method `{0}`")]
    UnsupportedHttpMethod(String),

    #[error("{0}")]
    JsonPathSyntax(String),

    #[error("unknown aggregation operator `{0}`")]
    AggregationInvalidOperator(String),

    #[error("{0}")]
    AggregationWrongDatatype(String),

    /// Aggregation mathematically undefined for the input (e.g. variance of one sample).
    #[error("{0}")]
    AggregationArithmetic(String),

    /// Non-2xx response. The message is the HTTP reason phrase.
    #[error("{reason}")]
    Http { status: u16, reason: String },
}

impl QueryError {
    /// Value written to the `error_code` column.
    pub fn code(&self) -> String {
        match self {
            QueryError::Unknown(_) => "1".into(),
            QueryError::InvalidQuery(_) => "2".into(),
            QueryError::UnsupportedHttpMethod(_) => "3".into(),
            QueryError::JsonPathSyntax(_) => "4".into(),
            QueryError::AggregationInvalidOperator(_) => "5".into(),
            QueryError::AggregationWrongDatatype(_) => "6".into(),
            QueryError::AggregationArithmetic(_) => "7".into(),
            QueryError::Http { status, .. } => status.to_string(),
        }
    }

    /// Symbolic class name, used in logs.
    pub fn class(&self) -> &'static str {
        match self {
            QueryError::Unknown(_) => "UNKNOWN_ERROR",
            QueryError::InvalidQuery(_) => "INVALID_QUERY",
            QueryError::UnsupportedHttpMethod(_) => "INVALID_OR_UNSUPPORTED_HTTP_METHOD",
            QueryError::JsonPathSyntax(_) => "JSONPATH_SYNTAX_ERROR",
            QueryError::AggregationInvalidOperator(_) => "AGGREGATION_INVALID_OPERATOR",
            QueryError::AggregationWrongDatatype(_) => "AGGREGATION_WRONG_DATATYPE",
            QueryError::AggregationArithmetic(_) => "AGGREGATION_ARITHMETIC_ERROR",
            QueryError::Http { .. } => "HTTP_ERROR",
        }
    }

    /// Downgrade a caught panic payload to [`QueryError::Unknown`].
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let text = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        QueryError::Unknown(format!("Panic: {text}"))
    }
}

/// Network-layer failures reported by an [`HttpTransport`](crate::HttpTransport).
///
/// The display form starts with the failure's name so the text written to
/// `error_message` stays diagnosable.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("ConnectionError: {0}")]
    Connect(String),

    #[error("RequestError: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let text = error_chain(&e);
        if e.is_timeout() {
            TransportError::Timeout(text)
        } else if e.is_connect() {
            TransportError::Connect(text)
        } else {
            TransportError::Request(text)
        }
    }
}

impl From<TransportError> for QueryError {
    fn from(e: TransportError) -> Self {
        QueryError::Unknown(e.to_string())
    }
}

/// Join an error with its sources: reqwest's own message omits the DNS or
/// socket cause.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
