use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Error,
    model::AssetRecord,
    pipeline::{Origin, RatioStrategy, RawRecord, Stage},
    provider::HTTP,
    types::MarginMarket,
};

pub const NAME: &str = "margin";

pub const STRATEGY: RatioStrategy = RatioStrategy::Quotient { epsilon: 1.0 };

/// Binance margin lending market: real borrowed and repaid totals.
#[derive(Debug)]
pub struct MarginStage {
    http: HTTP,
}

impl MarginStage {
    pub fn new(http: HTTP) -> Self {
        MarginStage { http }
    }
}

#[async_trait]
impl Stage for MarginStage {
    fn name(&self) -> &str {
        NAME
    }

    fn origin(&self) -> Origin {
        Origin::Upstream
    }

    async fn load(&self) -> Result<Vec<AssetRecord>, Error> {
        let market = self.http.get_margin_market().await?;

        if market.data.is_empty() {
            return Err(Error::UpstreamEmptyPayload(String::from(NAME)));
        }

        Ok(to_records(market, Utc::now()))
    }
}

pub fn to_records(market: MarginMarket, timestamp: DateTime<Utc>) -> Vec<AssetRecord> {
    market
        .data
        .into_iter()
        .filter_map(|asset| {
            RawRecord::new(&asset.asset, asset.total_borrowed, asset.total_repaid)
                .into_record(&STRATEGY, timestamp)
        })
        .collect()
}
