//! CLI entry point for the comic archiver.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use archiver_core::catalog::{ApiClient, SignedCatalog};
use archiver_core::config::{Settings, ensure_config_file};
use archiver_core::download::{ImageClient, ImagePool, RetryPolicy};
use archiver_core::orchestrator::{Orchestrator, RunOptions};
use archiver_core::{Database, Ledger};
use clap::Parser;
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    if ensure_config_file(&args.config)? {
        info!(
            path = %args.config.display(),
            "no configuration found, a template was written; fill in credentials and run again"
        );
        return Ok(());
    }

    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    debug!(?settings, "configuration loaded");

    let db = Database::new(&settings.storage.database)
        .await
        .with_context(|| format!("opening ledger {}", settings.storage.database.display()))?;
    let ledger = Ledger::new(db.clone());
    info!(tracked = ledger.count().await?, "ledger opened");

    let api = ApiClient::new(&settings.api)?;
    let session = match api
        .login(&settings.global.user_name, &settings.global.user_password)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            db.close().await;
            bail!("login failed: {e}");
        }
    };
    let catalog = SignedCatalog::new(api, session);

    let pool = ImagePool::new(
        settings.download.thread_number,
        RetryPolicy::with_max_attempts(settings.download.max_retries),
    )?;
    let images = ImageClient::new().context("building image client")?;

    let orchestrator = Orchestrator::new(
        Arc::new(catalog),
        Arc::new(ledger),
        pool,
        images,
        RunOptions::from_settings(&settings),
    );

    let result = orchestrator.run().await;
    db.close().await;

    match result {
        Ok(summary) => {
            info!(
                favorites = summary.favorites.comics,
                searched = summary.search.comics,
                chapters = summary.chapters_downloaded(),
                failed = summary.failed(),
                "run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "run aborted");
            Err(e.into())
        }
    }
}
