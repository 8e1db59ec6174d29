/// VlrBet — vlr.gg match API with live tracking and bet settlement
///
/// What it runs:
///   1. An HTTP API over the vlr.gg schedule, match stats and live scoreboard
///   2. A populate loop that starts tracking matches the moment they go live
///   3. A settle loop that re-checks tracked matches, records winners and
///      fires the settlement endpoint
///
/// Startup:
///   cargo run --bin vlr-api

use std::env;
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenv::dotenv;
use logger::EventLogger;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use vlr_scraper::VlrClient;

mod api;
mod config;
mod error;
mod lifecycle;
mod match_store;
mod settlement;

use api::ApiState;
use config::Config;
use lifecycle::LifecycleTracker;
use match_store::MatchStore;
use settlement::SettlementClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!("=== VlrBet API — vlr.gg live match tracking ===");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("vlrbet_api.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of vlr-api is already running! Exiting.");
            return Ok(());
        }
    };

    let cfg = Config::from_env();
    if cfg.api_keys.is_empty() {
        warn!("X_API_KEYS is empty: every API request will get a 401");
    }
    info!("Target: {}", cfg.vlr_base_url);
    info!(
        "Populate every {}s, settle every {}s",
        cfg.populate_interval_secs, cfg.settle_interval_secs
    );
    info!(
        "Settlement endpoint: {}",
        cfg.settlement_url.as_deref().unwrap_or("disabled (local settle only)")
    );

    let store = Arc::new(MatchStore::open(&cfg.db_path).context("open match store")?);
    let events = Arc::new(EventLogger::new(cfg.event_log_dir.clone()));
    let client = VlrClient::with_base_url(cfg.vlr_base_url.clone());
    let settlement = Arc::new(SettlementClient::new(cfg.settlement_url.clone()));

    let tracker = Arc::new(LifecycleTracker::new(
        client.clone(),
        Arc::clone(&store),
        settlement,
        Arc::clone(&events),
        Duration::from_secs(cfg.populate_interval_secs),
        Duration::from_secs(cfg.settle_interval_secs),
    ));
    tracker.spawn();

    let cfg = Arc::new(cfg);
    let state = ApiState {
        cfg: Arc::clone(&cfg),
        client,
        store,
        events,
    };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("bind {}", cfg.bind_addr))?;
    info!("Listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await.context("serve api")?;

    Ok(())
}
