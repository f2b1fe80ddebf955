use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub http_bind: String,
    pub db_pool_min: u32,
    pub db_pool_max: u32,
    pub db_acquire_timeout_secs: u64,
    pub observer_queue: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let database_url = env::var("NOISE_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .context("NOISE_DATABASE_URL or DATABASE_URL is required")?;

        let http_bind = env::var("NOISE_HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let db_pool_min = env::var("NOISE_DB_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);
        let db_pool_max = env::var("NOISE_DB_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);
        let db_acquire_timeout_secs = env::var("NOISE_DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(120);
        let observer_queue = env::var("NOISE_OBSERVER_QUEUE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(64);

        Ok(Self {
            database_url,
            http_bind,
            db_pool_min,
            db_pool_max,
            db_acquire_timeout_secs,
            observer_queue,
        })
    }

    pub fn db_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.db_acquire_timeout_secs)
    }
}
