//! Application configuration.

use crate::error::{AppError, AppResult};
use desk_feed::{FeedFilter, LiveFeedConfig};
use desk_ws::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file used when neither `--config` nor `DESK_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Live feed section (`[feed]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Relay WebSocket URL.
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Fixed delay before every reconnect (ms). Default: 3000.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Frame channel capacity between connection and reconciler.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Start with the signals-only view.
    #[serde(default)]
    pub signals_only: bool,
}

fn default_feed_url() -> String {
    "ws://localhost:8765".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            channel_capacity: default_channel_capacity(),
            signals_only: false,
        }
    }
}

impl From<&FeedConfig> for LiveFeedConfig {
    fn from(cfg: &FeedConfig) -> Self {
        Self {
            connection: ConnectionConfig {
                url: cfg.url.clone(),
                reconnect_delay_ms: cfg.reconnect_delay_ms,
            },
            channel_capacity: cfg.channel_capacity,
            filter: FeedFilter::from(cfg.signals_only),
        }
    }
}

/// Order source section (`[orders]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersConfig {
    /// Root of the order API.
    #[serde(default = "default_orders_base_url")]
    pub base_url: String,
    /// Per-request timeout (ms). Default: 10,000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_orders_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            base_url: default_orders_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl OrdersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
}

impl AppConfig {
    /// Resolve the config path: CLI arg > `DESK_CONFIG` env var > default.
    pub fn resolve_path(cli_path: Option<String>) -> String {
        cli_path
            .or_else(|| std::env::var("DESK_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the feed or the order source cannot work with.
    pub fn validate(&self) -> AppResult<()> {
        if !(self.feed.url.starts_with("ws://") || self.feed.url.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "feed.url must be a ws:// or wss:// URL, got {:?}",
                self.feed.url
            )));
        }
        if self.feed.channel_capacity == 0 {
            return Err(AppError::Config(
                "feed.channel_capacity must be at least 1".to_string(),
            ));
        }
        if !(self.orders.base_url.starts_with("http://")
            || self.orders.base_url.starts_with("https://"))
        {
            return Err(AppError::Config(format!(
                "orders.base_url must be an http:// or https:// URL, got {:?}",
                self.orders.base_url
            )));
        }
        if self.orders.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "orders.request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
