//! Stage implementations and the assembly of the two pipelines.

use std::path::PathBuf;

use tracing::warn;

use crate::{
    configuration::Config,
    pipeline::{Pipeline, RankPolicy, SampleTable, Stage},
    provider::{DatabasePool, SnapshotFile, HTTP},
};

pub use self::{
    binance::BinanceStage, binance_margin::MarginStage, cache::CacheStage,
    coingecko::CoinGeckoStage, dashboard::DashboardStage,
    sample::SampleStage, store::StoreStage,
};

pub mod binance;
pub mod binance_margin;
pub mod cache;
pub mod coingecko;
pub mod dashboard;
pub mod sample;
pub mod store;

/// The web surface shows 20 rows, the chat surface 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Web,
    Chat,
}

impl PipelineKind {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineKind::Web => "web",
            PipelineKind::Chat => "chat",
        }
    }

    pub fn limit(&self, config: &Config) -> usize {
        match self {
            PipelineKind::Web => config.web_limit,
            PipelineKind::Chat => config.chat_limit,
        }
    }

    pub fn cache_file(&self, config: &Config) -> PathBuf {
        match self {
            PipelineKind::Web => config.web_cache_file.to_owned(),
            PipelineKind::Chat => config.chat_cache_file.to_owned(),
        }
    }

    pub fn sample_table(&self) -> SampleTable {
        match self {
            PipelineKind::Web => SampleTable::Web,
            PipelineKind::Chat => SampleTable::Chat,
        }
    }
}

/// `SOURCES` in order, then cache, store (when configured) and sample.
/// Only the web pipeline appends to the store, so one refresh writes one
/// history batch.
pub fn build_pipeline(
    kind: PipelineKind,
    config: &Config,
    http: &HTTP,
    database: Option<&DatabasePool>,
) -> Pipeline {
    let policy = RankPolicy::new(config.ratio_threshold, kind.limit(config));
    let cache = SnapshotFile::new(kind.cache_file(config));

    let mut pipeline = Pipeline::new(kind.name(), policy);

    for source in &config.sources {
        match upstream_stage(source, config, http) {
            Some(stage) => pipeline = pipeline.with_stage(stage),
            None => warn!("[{}] unknown source {} ignored", kind.name(), source),
        }
    }

    pipeline = pipeline.with_stage(Box::new(CacheStage::new(
        cache.clone(),
        config.cache_max_age(),
    )));

    if let Some(database) = database {
        pipeline = pipeline.with_stage(Box::new(StoreStage::new(
            database.asset_history.clone(),
            config.store_max_age(),
            policy,
        )));
    }

    pipeline = pipeline
        .with_stage(Box::new(SampleStage::new(kind.sample_table())))
        .with_sink(Box::new(cache));

    if let (PipelineKind::Web, Some(database)) = (kind, database) {
        pipeline = pipeline.with_sink(Box::new(database.asset_history.clone()));
    }

    pipeline
}

fn upstream_stage(
    source: &str,
    config: &Config,
    http: &HTTP,
) -> Option<Box<dyn Stage>> {
    let stage: Box<dyn Stage> = match source {
        coingecko::NAME => Box::new(CoinGeckoStage::new(http.clone())),
        binance::NAME => Box::new(BinanceStage::new(
            http.clone(),
            config.binance_symbol_limit,
        )),
        binance_margin::NAME => Box::new(MarginStage::new(http.clone())),
        dashboard::NAME => Box::new(DashboardStage::new(http.clone())),
        _ => return None,
    };

    Some(stage)
}
