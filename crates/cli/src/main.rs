mod cli;
mod table_io;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use pancake_core::config::{load_dotenv, Config};
use pancake_query::{ReqwestTransport, ResultTable, Runner};

use crate::cli::{log_directive, CliArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // RUST_LOG wins over --logging-level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(log_directive(&args.logging_level))
            }),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let mut config = Config::load(&args.profile, args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(n) = args.concurrency {
        config.http.concurrency = n.max(1);
    }
    config.log_summary();

    let rows = table_io::read_rows(&args.rows)?;
    info!(rows = rows.len(), file = %args.rows.display(), "Rows loaded");

    let transport = ReqwestTransport::new(Duration::from_secs(config.http.timeout_secs))
        .context("failed to build HTTP client")?;
    let runner = Runner::new(Arc::new(transport))
        .with_concurrency(config.http.concurrency)
        .with_max_pages(config.http.max_pages);

    let table = ResultTable::new(runner.run(&rows, &config.secrets).await);

    match &args.output {
        Some(path) => {
            table_io::write_table(path, &table)?;
            info!(file = %path.display(), "Results written");
        }
        None => println!("{table}"),
    }

    Ok(())
}
