mod analysis;
mod config;
mod error;
mod excel;
mod logging;
mod markets;
mod report;
mod scheduler;

use crate::config::AppConfig;
use crate::markets::MarketClient;
use log::info;

const CONFIG_FILE: &str = "config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::setup_logging()?;

    let config = AppConfig::load_or_default(CONFIG_FILE).await?;
    info!(
        "Tracking top {} assets priced in {}, updating every {} seconds",
        config.market.per_page, config.market.vs_currency, config.scheduler.interval_secs
    );

    let client = MarketClient::new(&config.market)?;

    // Racing the loop against ctrl-c keeps shutdown prompt even mid-sleep.
    tokio::select! {
        result = scheduler::run(client, &config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            Ok(())
        }
    }
}
