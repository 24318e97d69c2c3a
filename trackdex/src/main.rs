//! trackdex binary - runs one ingest batch
//!
//! Scans the configured library directory once, processes every
//! audio file found, and exits with a summary. Scheduling repeated
//! batches is the job of whatever invokes this (cron, systemd timer).

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting trackdex {}", env!("CARGO_PKG_VERSION"));

    let config = trackdex::config::Config::load()?;
    info!(
        library = %config.library_dir.display(),
        database = %config.database_path.display(),
        "configuration resolved"
    );

    let db_pool = trackdex::db::init_db_pool(&config.database_path).await?;
    info!("Database connection established");

    let pipeline =
        trackdex::workflow::IngestPipeline::with_default_services(db_pool, &config)?;
    let summary = pipeline.run_batch(&config.library_dir).await?;

    info!(%summary, "indexing complete");
    Ok(())
}
