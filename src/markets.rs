use crate::config::MarketConfig;
use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

/// One provider record with every field preserved, typed lazily by the
/// analyzer and written field-by-field by the persister.
pub type RawRecord = Map<String, Value>;

/// Anything the scheduler can pull a snapshot from. The live implementation
/// is [`MarketClient`]; tests script their own.
#[async_trait]
pub trait MarketSource {
    /// Returns the records of one fetch cycle, or an empty Vec on any
    /// failure. Failures are logged here, never raised.
    async fn fetch_snapshot(&self) -> Vec<RawRecord>;
}

pub struct MarketClient {
    client: Client,
    config: MarketConfig,
}

impl MarketClient {
    pub fn new(config: &MarketConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

pub(crate) fn query_params(config: &MarketConfig) -> Vec<(&'static str, String)> {
    vec![
        ("vs_currency", config.vs_currency.clone()),
        ("order", config.order.clone()),
        ("per_page", config.per_page.to_string()),
        ("page", config.page.to_string()),
        ("sparkline", config.sparkline.to_string()),
    ]
}

#[async_trait]
impl MarketSource for MarketClient {
    async fn fetch_snapshot(&self) -> Vec<RawRecord> {
        let resp = self
            .client
            .get(&self.config.endpoint)
            .query(&query_params(&self.config))
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    warn!("Error fetching data: HTTP {}", status);
                    return Vec::new();
                }

                match response.json::<Vec<RawRecord>>().await {
                    Ok(records) => records,
                    Err(e) => {
                        warn!("Error decoding market data: {}", e);
                        Vec::new()
                    }
                }
            }
            Err(e) => {
                warn!("Error fetching data: {}", e);
                Vec::new()
            }
        }
    }
}
