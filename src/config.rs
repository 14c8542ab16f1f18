use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

// CONFIGURATION STRUCTS
// Every field has a default matching the values the tracker shipped with,
// so an empty or partial config file is always usable.

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MarketConfig {
    pub endpoint: String,          // CoinGecko markets endpoint
    pub vs_currency: String,       // e.g. "usd"
    pub order: String,             // e.g. "market_cap_desc"
    pub per_page: u32,             // number of assets per fetch
    pub page: u32,                 // pagination offset
    pub sparkline: bool,           // auxiliary series data, unused downstream
    pub request_timeout_secs: u64, // hard cap on one HTTP request
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.coingecko.com/api/v3/coins/markets".to_string(),
            vs_currency: "usd".to_string(),
            order: "market_cap_desc".to_string(),
            per_page: 50,
            page: 1,
            sparkline: false,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: u64,    // normal wait between cycles
    pub retry_delay_secs: u64, // shorter wait after an empty or rejected fetch
    // When true, a snapshot that fails validation stops the process instead
    // of being retried like an empty fetch.
    pub halt_on_validation_error: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            retry_delay_secs: 300,
            halt_on_validation_error: false,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf, // spreadsheet target, overwritten every cycle
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("crypto_data.xlsx"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    // Nested structs organize the config logically
    pub market: MarketConfig,
    pub scheduler: SchedulerConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Loads the config from a JSON file, falling back to defaults when the
    /// file does not exist. A file that exists but fails to parse is a
    /// startup error rather than a silent fallback.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match fs::read(path).await {
            Ok(content) => {
                // Read raw bytes and let serde_json scan them directly.
                let config = serde_json::from_slice(&content)
                    .with_context(|| format!("invalid config file {:?}", path))?;
                info!("Loaded configuration from {:?}", path);
                Ok(config)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No config file at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(err) => {
                Err(err).with_context(|| format!("could not read config file {:?}", path))
            }
        }
    }
}
