use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use estiba_sync::fetch::HttpFetcher;
use estiba_sync::{config, db, sync};

#[derive(Debug, Parser)]
#[command(author, version, about = "Run one sync cycle and exit")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Run even outside the configured working-hours window
    #[arg(long)]
    ignore_window: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(args.config.as_path()))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/estiba.db", cfg.app.data_dir));

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let fetcher = HttpFetcher::new();
    let report = if args.ignore_window {
        sync::run_sources(&pool, &fetcher, &cfg).await
    } else {
        sync::run_cycle(&pool, &fetcher, &cfg).await?
    };

    info!(skipped = report.skipped, "cycle finished");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
