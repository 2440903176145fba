use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::Error,
    model::AssetRecord,
    pipeline::{Origin, RatioStrategy, RawRecord, Stage},
    provider::HTTP,
    types::CoinGeckoMarket,
};

pub const NAME: &str = "coingecko";

/// Equivalent to `volume / market_cap * 100 * (1 + |pct| / 100)` once
/// `metric_b` is `market_cap / 10`.
pub const STRATEGY: RatioStrategy = RatioStrategy::VolatilityAdjusted {
    epsilon: 0.1,
    scale: 10.0,
};

/// Primary source: `/coins/markets` ordered by volume.
#[derive(Debug)]
pub struct CoinGeckoStage {
    http: HTTP,
}

impl CoinGeckoStage {
    pub fn new(http: HTTP) -> Self {
        CoinGeckoStage { http }
    }
}

#[async_trait]
impl Stage for CoinGeckoStage {
    fn name(&self) -> &str {
        NAME
    }

    fn origin(&self) -> Origin {
        Origin::Upstream
    }

    async fn load(&self) -> Result<Vec<AssetRecord>, Error> {
        let markets = self.http.get_coingecko_markets().await?;

        if markets.is_empty() {
            return Err(Error::UpstreamEmptyPayload(String::from(NAME)));
        }

        let timestamp = Utc::now();
        let records = markets
            .into_iter()
            .map(to_raw)
            .filter_map(|raw| raw.into_record(&STRATEGY, timestamp))
            .collect();

        Ok(records)
    }
}

/// Missing volume or market cap count as zero.
pub fn to_raw(market: CoinGeckoMarket) -> RawRecord {
    RawRecord {
        symbol: market.symbol,
        name: Some(market.name),
        metric_a: market.total_volume.unwrap_or(0.0),
        metric_b: market.market_cap.unwrap_or(0.0) / 10.0,
        change_24h: market.price_change_percentage_24h,
    }
}
