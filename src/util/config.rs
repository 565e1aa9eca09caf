//! Runtime configuration for the binary, read from environment variables.

use std::{env, path::PathBuf};

use crate::infra::albion::DEFAULT_BASE_URL;

const DEFAULT_CATALOG_PATH: &str = "items.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the market data service.
    pub market_api_base_url: String,
    /// JSON item catalog to load at startup.
    pub item_catalog_path: PathBuf,
    /// Overrides the stored refresh interval when set.
    pub refresh_interval_ms: Option<u64>,
}

impl AppConfig {
    /// Environment variables:
    /// - `MARKET_API_BASE_URL` (default: the public west server)
    /// - `ITEM_CATALOG_PATH` (default: `items.json`)
    /// - `REFRESH_INTERVAL_MS` (default: unset, use saved settings)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            market_api_base_url: lookup("MARKET_API_BASE_URL")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            item_catalog_path: lookup("ITEM_CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH)),
            refresh_interval_ms: lookup("REFRESH_INTERVAL_MS").and_then(|s| s.trim().parse().ok()),
        }
    }
}
