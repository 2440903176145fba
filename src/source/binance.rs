use std::collections::BTreeMap;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::warn;

use crate::{
    error::Error,
    model::AssetRecord,
    pipeline::{Origin, RatioStrategy, RawRecord, Stage},
    provider::HTTP,
    types::{ExchangeInfo, KlineRow, SymbolInfo},
};

pub const NAME: &str = "binance";

pub const STRATEGY: RatioStrategy = RatioStrategy::Quotient { epsilon: 1.0 };

const MAX_CONCURRENT_REQUESTS: usize = 8;

/// Secondary source: daily candles used as a buy/sell pressure proxy.
#[derive(Debug)]
pub struct BinanceStage {
    http: HTTP,
    symbol_limit: usize,
}

impl BinanceStage {
    pub fn new(http: HTTP, symbol_limit: usize) -> Self {
        BinanceStage { http, symbol_limit }
    }

    /// Previous day's candle, `None` when the market has less than two days.
    async fn previous_candle(&self, symbol: &str) -> Result<Option<Candle>, Error> {
        let rows = self.http.get_klines(symbol).await?;

        if rows.len() < 2 {
            return Ok(None);
        }

        Ok(Some(Candle::from_row(&rows[0])?))
    }
}

#[async_trait]
impl Stage for BinanceStage {
    fn name(&self) -> &str {
        NAME
    }

    fn origin(&self) -> Origin {
        Origin::Upstream
    }

    async fn load(&self) -> Result<Vec<AssetRecord>, Error> {
        let info = self.http.get_exchange_info().await?;
        let symbols = select_symbols(info, self.symbol_limit);

        if symbols.is_empty() {
            return Err(Error::UpstreamEmptyPayload(String::from(NAME)));
        }

        let candles: Vec<(String, Candle)> = stream::iter(symbols)
            .map(|symbol| async move {
                let result = self.previous_candle(&symbol.symbol).await;

                match result {
                    Ok(candle) => candle.map(|candle| (symbol.base_asset, candle)),
                    Err(err) => {
                        warn!("{} skipped {}: {}", NAME, symbol.symbol, err);
                        None
                    },
                }
            })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .filter_map(|candle| async move { candle })
            .collect()
            .await;

        if candles.is_empty() {
            return Err(Error::UpstreamEmptyPayload(String::from(NAME)));
        }

        Ok(aggregate(candles, Utc::now()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn from_row(row: &KlineRow) -> anyhow::Result<Candle> {
        Ok(Candle {
            open: field(row, 1, "open")?,
            close: field(row, 4, "close")?,
            volume: field(row, 5, "volume")?,
        })
    }

    /// `(borrow, repay)`: a green candle splits volume 60/40, any other 40/60.
    pub fn split(&self) -> (f64, f64) {
        if self.close > self.open {
            (self.volume * 0.6, self.volume * 0.4)
        } else {
            (self.volume * 0.4, self.volume * 0.6)
        }
    }
}

fn field(row: &KlineRow, index: usize, name: &str) -> anyhow::Result<f64> {
    let value = row
        .get(index)
        .with_context(|| format!("kline has no {} field", name))?;

    match value {
        Value::String(value) => value
            .parse::<f64>()
            .with_context(|| format!("kline {} is not numeric: {}", name, value)),
        Value::Number(value) => value
            .as_f64()
            .with_context(|| format!("kline {} is out of range", name)),
        _ => bail!("kline {} has unexpected type", name),
    }
}

/// First `limit` symbols that are currently trading, in listing order.
pub fn select_symbols(info: ExchangeInfo, limit: usize) -> Vec<SymbolInfo> {
    info.symbols
        .into_iter()
        .filter(|symbol| symbol.is_trading())
        .take(limit)
        .collect()
}

/// Sums the split volumes of every pair per base asset and emits one record
/// per base asset.
pub fn aggregate(
    candles: Vec<(String, Candle)>,
    timestamp: DateTime<Utc>,
) -> Vec<AssetRecord> {
    let mut totals: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for (base_asset, candle) in candles {
        let (borrow, repay) = candle.split();
        let total = totals.entry(base_asset).or_insert((0.0, 0.0));
        total.0 += borrow;
        total.1 += repay;
    }

    totals
        .into_iter()
        .filter_map(|(base_asset, (borrow, repay))| {
            RawRecord::new(&base_asset, borrow, repay).into_record(&STRATEGY, timestamp)
        })
        .collect()
}
