use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use estiba_sync::fetch::HttpFetcher;
use estiba_sync::{config, db, sync};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
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
    let interval = Duration::from_secs(cfg.sync.interval_seconds);

    info!(interval_secs = cfg.sync.interval_seconds, "starting sync service");
    loop {
        match sync::run_cycle(&pool, &fetcher, &cfg).await {
            Ok(report) => {
                if report.skipped {
                    info!("cycle skipped (outside window)");
                } else {
                    for outcome in &report.outcomes {
                        info!(
                            source = outcome.source,
                            ok = outcome.ok,
                            inserted = outcome.inserted,
                            rejected = outcome.rejected,
                            errored = outcome.errored,
                            "source synced"
                        );
                    }
                }
            }
            Err(err) => error!(?err, "sync cycle error"),
        }
        tokio::time::sleep(interval).await;
    }
}
