//! File-backed row source and result sink.

use std::path::Path;

use anyhow::{bail, Context, Result};
use pancake_query::ResultTable;
use serde_json::Value;

/// Read query rows from a JSON array of arrays.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rows file {}", path.display()))?;
    parse_rows(&content).with_context(|| format!("invalid rows file {}", path.display()))
}

/// Parse the rows document. Cells are taken as text: strings verbatim,
/// `null` as empty, anything else as its JSON text. A row that is not an
/// array becomes a single-cell row and is reported by the query engine.
pub fn parse_rows(content: &str) -> Result<Vec<Vec<String>>> {
    let doc: Value = serde_json::from_str(content).context("rows file is not valid JSON")?;
    let Value::Array(rows) = doc else {
        bail!("rows file must contain a JSON array of rows");
    };

    Ok(rows
        .into_iter()
        .map(|row| match row {
            Value::Array(cells) => cells.into_iter().map(cell_text).collect(),
            other => vec![cell_text(other)],
        })
        .collect())
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Write the result table as pretty JSON.
pub fn write_table(path: &Path, table: &ResultTable) -> Result<()> {
    let json = serde_json::to_string_pretty(&table.to_json())?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write results to {}", path.display()))
}
