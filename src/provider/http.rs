use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::{
    configuration::Config,
    error::Error,
    types::{
        CoinGeckoMarket, DashboardPayload, ExchangeInfo, KlineRow, MarginMarket,
    },
};

/// Upstream market-data client; every call is bounded by `TIMEOUT`.
#[derive(Debug, Clone)]
pub struct HTTP {
    pub config: Config,
    client: Client,
}

impl HTTP {
    pub fn new(config: Config) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;

        Ok(HTTP { config, client })
    }

    pub async fn get_coingecko_markets(
        &self,
    ) -> Result<Vec<CoinGeckoMarket>, Error> {
        let url = self.config.get_coingecko_markets_url()?;
        debug!("GET {}{}", url.host_str().unwrap_or_default(), url.path());
        let json = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CoinGeckoMarket>>()
            .await?;
        Ok(json)
    }

    pub async fn get_exchange_info(&self) -> Result<ExchangeInfo, Error> {
        let url = self.config.get_exchange_info_url()?;
        let json = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<ExchangeInfo>()
            .await?;
        Ok(json)
    }

    pub async fn get_klines(&self, symbol: &str) -> Result<Vec<KlineRow>, Error> {
        let url = self.config.get_klines_url(symbol)?;
        let json = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<KlineRow>>()
            .await?;
        Ok(json)
    }

    pub async fn get_margin_market(&self) -> Result<MarginMarket, Error> {
        let url = self.config.get_margin_market_url()?;
        let json = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<MarginMarket>()
            .await?;
        Ok(json)
    }

    pub async fn get_dashboard_data(&self) -> Result<DashboardPayload, Error> {
        let url = self.config.get_dashboard_url()?;
        let json = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<DashboardPayload>()
            .await?;
        Ok(json)
    }
}
