use bond_yield_watcher::bonds::{BossaListingSource, NotoriaClient, WorkerPool};
use bond_yield_watcher::config::Config;
use bond_yield_watcher::cycle::BondWatcher;
use bond_yield_watcher::db::DbManager;
use bond_yield_watcher::logging;
use bond_yield_watcher::notify::{DiscordWebhookNotifier, LogNotifier, Notifier};
use bond_yield_watcher::schedule::{next_delay, should_fetch};

use chrono::Utc;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment variables from .env file, if present
    dotenv().ok();

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    // Load configuration; invalid values stop the process before any work starts
    let cfg = Config::load()?;
    info!(
        workers = cfg.worker_count,
        publish = cfg.publish,
        check_trading_hours = cfg.check_trading_hours,
        criteria = ?cfg.criteria,
        "Configuration loaded and logging initialized"
    );

    // Initialize database manager
    let db = Arc::new(DbManager::init(&cfg).await?);
    info!("Database manager initialized");

    let client = Arc::new(NotoriaClient::from_config(&cfg)?);
    let listing_source = Arc::new(BossaListingSource::new(&cfg.listing_url, cfg.request_timeout)?);
    let notifier: Arc<dyn Notifier> = match (&cfg.discord_webhook_url, cfg.publish) {
        (Some(url), true) => Arc::new(DiscordWebhookNotifier::new(url, cfg.request_timeout)?),
        _ => Arc::new(LogNotifier),
    };
    let pool = WorkerPool::new(client, db.clone(), cfg.worker_count, cfg.retry_policy)?;
    let watcher = BondWatcher::new(listing_source, pool, db, notifier, cfg.criteria.clone());

    info!("Starting bond watch loop");
    loop {
        let now = Utc::now();
        if should_fetch(now, cfg.check_trading_hours) {
            // A failed cycle is already announced; keep the loop alive
            if let Err(e) = watcher.run_cycle(now).await {
                error!(error = %e, "Cycle skipped");
            }
        } else {
            debug!("Outside trading hours, skipping cycle");
        }

        let delay = next_delay(cfg.fetch_delay_min, cfg.fetch_delay_max);
        debug!(delay_secs = delay.as_secs(), "Waiting for next cycle");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }
    Ok(())
}
