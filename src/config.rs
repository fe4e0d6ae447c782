use crate::mood::FallbackPolicy;
use crate::tmdb::TMDB_BASE;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const DEFAULT_BIND: &str = "0.0.0.0:3146";
const DEFAULT_REGION: &str = "US";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub image_base: String,
    pub watch_region: String,
    pub fallback: FallbackPolicy,
    /// Licensed player template; `{id}` is replaced by the TMDB movie id.
    pub player_embed_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let tmdb_api_key =
            get("TMDB_API_KEY").ok_or_else(|| anyhow!("TMDB_API_KEY must be set"))?;

        let min_results = match get("MOOD_MIN_RESULTS") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MOOD_MIN_RESULTS must be a whole number, got '{}'", raw))?,
            None => FallbackPolicy::default().min_results,
        };

        let player_embed_url = get("PLAYER_EMBED_URL");
        if let Some(template) = player_embed_url.as_deref() {
            if !template.contains("{id}") {
                anyhow::bail!("PLAYER_EMBED_URL must contain an {{id}} placeholder");
            }
        }

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .with_context(|| format!("BIND_ADDR is not a socket address: '{}'", bind_raw))?;

        let timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("HTTP_TIMEOUT_SECS must be a whole number, got '{}'", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            anyhow::bail!("HTTP_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url: get("TMDB_BASE_URL").unwrap_or_else(|| TMDB_BASE.to_string()),
            image_base: get("TMDB_IMAGE_BASE").unwrap_or_else(|| IMAGE_BASE.to_string()),
            watch_region: get("WATCH_REGION")
                .map(|r| r.to_uppercase())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            fallback: FallbackPolicy { min_results },
            player_embed_url,
            bind_addr,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn log_summary(&self) {
        info!(
            base = %self.tmdb_base_url,
            region = %self.watch_region,
            min_results = self.fallback.min_results,
            player = self.player_embed_url.is_some(),
            "Configuration loaded"
        );
    }
}
