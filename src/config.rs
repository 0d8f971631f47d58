use anyhow::{Context, Result, bail};
use std::env;
use std::time::Duration;

use crate::grades::aggregate::DEFAULT_CONCURRENCY;

/// Backend connection settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub fetch_concurrency: usize,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = lookup("GRADES_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("GRADES_API_BASE_URL must be set")?;

        let api_token = lookup("GRADES_API_TOKEN").filter(|v| !v.is_empty());

        let fetch_concurrency = match lookup("GRADES_FETCH_CONCURRENCY") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("GRADES_FETCH_CONCURRENCY is not a number: {v}"))?,
            None => DEFAULT_CONCURRENCY,
        };
        if fetch_concurrency == 0 {
            bail!("GRADES_FETCH_CONCURRENCY must be at least 1");
        }

        let timeout_secs = match lookup("GRADES_HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("GRADES_HTTP_TIMEOUT_SECS is not a number: {v}"))?,
            None => 30,
        };

        Ok(Self {
            api_base_url: api_base_url.trim().to_string(),
            api_token,
            fetch_concurrency,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
