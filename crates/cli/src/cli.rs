use std::path::PathBuf;

use clap::Parser;

/// Run a table of HTTP/JSON queries and write one result row per query.
///
/// Each input row is `[http_parameters_json, jsonpath_query, aggregation]`.
/// Failing rows are reported in the result table; the batch always completes.
#[derive(Parser, Debug)]
#[command(name = "supreme-pancake", version, about = "Batch HTTP/JSON query runner")]
pub struct CliArgs {
    /// JSON file holding an array of query rows (arrays of three strings)
    #[arg(long)]
    pub rows: PathBuf,

    /// Write the result table as JSON to this file instead of printing it
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// TOML file with [secrets], [options] and [http] tables
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Environment profile; variables are looked up as {PROFILE}_{KEY} first
    #[arg(long, env = "PANCAKE_PROFILE", default_value = "")]
    pub profile: String,

    /// Rows executed at once (overrides PANCAKE_CONCURRENCY)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// CRITICAL, ERROR, WARNING, INFO or DEBUG. RUST_LOG takes precedence.
    #[arg(short = 'l', long, default_value = "INFO")]
    pub logging_level: String,
}

/// Map a logging level name onto a tracing filter directive.
/// Unknown names fall back to `warn`.
pub fn log_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "CRITICAL" | "ERROR" => "error",
        "WARNING" | "WARN" => "warn",
        "INFO" => "info",
        "DEBUG" => "debug",
        _ => "warn",
    }
}
