use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregated;
use crate::error::QueryError;

/// Column header of the result table, in column order.
pub const HEADER: [&str; 7] = [
    "result",
    "size",
    "length",
    "error_code",
    "error_message",
    "query_start",
    "query_end",
];

/// `error_code` of a successful query.
pub const SUCCESS_CODE: &str = "0";

/// Outcome of one query, one row of the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Stringified result; empty on failure.
    pub result: String,
    /// UTF-8 byte length of `result`.
    pub size: usize,
    /// Element count when the result is a sequence, -1 otherwise.
    pub length: i64,
    pub error_code: String,
    pub error_message: String,
    pub query_start: DateTime<Utc>,
    pub query_end: DateTime<Utc>,
}

impl ResultRow {
    pub fn success(value: &Aggregated, query_start: DateTime<Utc>, query_end: DateTime<Utc>) -> Self {
        let result = value.to_string();
        Self {
            size: result.len(),
            length: value.length(),
            result,
            error_code: SUCCESS_CODE.to_string(),
            error_message: String::new(),
            query_start,
            query_end,
        }
    }

    pub fn failure(error: &QueryError, query_start: DateTime<Utc>, query_end: DateTime<Utc>) -> Self {
        Self {
            result: String::new(),
            size: 0,
            length: -1,
            error_code: error.code(),
            error_message: error.to_string(),
            query_start,
            query_end,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code == SUCCESS_CODE
    }

    /// The row as 7 cells, in [`HEADER`] order.
    pub fn to_record(&self) -> [String; 7] {
        [
            self.result.clone(),
            self.size.to_string(),
            self.length.to_string(),
            self.error_code.clone(),
            self.error_message.clone(),
            format_timestamp(&self.query_start),
            format_timestamp(&self.query_end),
        ]
    }
}

/// UTC ISO-8601 with microseconds, e.g. `2024-05-01T12:00:00.000000Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The 7-column table handed to a result sink.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn records(&self) -> Vec<[String; 7]> {
        self.rows.iter().map(ResultRow::to_record).collect()
    }

    /// `{"header": [...], "rows": [[...], ...]}` with every cell as a string.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "header": HEADER,
            "rows": self.records(),
        })
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let records = self.records();

        // Column widths (minimum = header length).
        let mut widths: Vec<usize> = HEADER.iter().map(|h| h.len()).collect();
        for record in &records {
            for (i, cell) in record.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        for (i, name) in HEADER.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{:<width$}", name, width = widths[i])?;
        }
        writeln!(f)?;

        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                write!(f, "-+-")?;
            }
            write!(f, "{}", "-".repeat(*w))?;
        }
        writeln!(f)?;

        for record in &records {
            for (i, cell) in record.iter().enumerate() {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{:<width$}", cell, width = widths[i])?;
            }
            writeln!(f)?;
        }

        let failed = self.rows.iter().filter(|r| !r.is_success()).count();
        write!(f, "{} rows | {} failed", self.rows.len(), failed)
    }
}
