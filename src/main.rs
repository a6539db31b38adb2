// main.rs
// Worker wiring: loads config from the environment, prepares MongoDB state and
// keeps asset statuses in sync with their maintenance schedules until Ctrl-C.

use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bizledger::{config::Config, maintenance, state};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let state = Arc::new(state::init_state(&config).await?);
    info!(db = %config.mongodb_db, "connected to MongoDB");

    let updater = maintenance::spawn_status_updater(state.clone(), config.status_poll_interval);
    info!(
        every_secs = config.status_poll_interval.as_secs(),
        "asset status updater running"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    updater.abort();
    Ok(())
}
