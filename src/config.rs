// config.rs
// Runtime settings read from the environment (after dotenv has loaded .env).

use anyhow::{Context, Result, bail};
use std::{env, time::Duration};

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub seed_file: String,
    pub status_poll_interval: Duration,
    pub default_currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mongodb_uri =
            env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let mongodb_db = env::var("MONGODB_DB").unwrap_or_else(|_| "bizledger".to_string());
        let seed_file = env::var("SEED_FILE").unwrap_or_else(|_| "./data/seed.json".to_string());

        let poll_seconds: u64 = env::var("STATUS_POLL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .context("STATUS_POLL_SECONDS must be a whole number of seconds")?;
        if poll_seconds == 0 {
            bail!("STATUS_POLL_SECONDS must be greater than zero");
        }

        let default_currency = env::var("DEFAULT_CURRENCY")
            .ok()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "INR".to_string());

        Ok(Config {
            mongodb_uri,
            mongodb_db,
            seed_file,
            status_poll_interval: Duration::from_secs(poll_seconds),
            default_currency,
        })
    }
}
