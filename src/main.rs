//! salesheet - feeds sales-tagged CRM contacts into a reporting spreadsheet.
//!
//! Pulls recent contacts from every configured HighLevel location, flattens
//! them into dashboard rows, and replaces the body of the spreadsheet's
//! "Raw Data" tab. Built to run unattended from cron: a completed run exits
//! 0 even when individual locations fail, anything that would make the run
//! meaningless exits 1.

mod config;
mod highlevel;
mod models;
mod pipeline;
mod sheets;
mod transform;

use std::io;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use pipeline::Pipeline;
use sheets::SheetsClient;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Set up logging with environment-based filter
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let dry_run = args.len() > 1 && args[1] == "--dry-run";

    info!(version = env!("CARGO_PKG_VERSION"), dry_run, "salesheet starting");

    let config = Config::load().context("Configuration error")?;
    let mut sheets = SheetsClient::new(&config)?;

    if !dry_run {
        // Bad Google credentials should fail the run here, not after
        // minutes of CRM paging.
        sheets
            .ensure_token()
            .await
            .context("Google token exchange failed")?;
    }

    let report = Pipeline::new(config)?.run().await;
    report.log_summary();

    if dry_run {
        info!("Dry run: destination sheet left untouched");
        return Ok(());
    }

    sheets
        .replace(&report.rows)
        .await
        .context("Failed to replace the dashboard body")?;

    info!("salesheet run complete");
    Ok(())
}
