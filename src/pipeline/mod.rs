//! Normalization and fallback pipeline.
//!
//! Adapters produce `RawRecord`s, a per-adapter `RatioStrategy` turns them
//! into `AssetRecord`s, and a `Pipeline` walks its ordered stages until one
//! yields data.

pub mod history;
pub mod orchestrator;
pub mod rank;
pub mod ratio;
pub mod sample;
pub mod snapshot;

pub use self::{
    orchestrator::{Origin, Pipeline, Sink, Stage},
    rank::{rank, RankPolicy},
    ratio::{derive, RatioStrategy, RawRecord},
    sample::SampleTable,
    snapshot::{Snapshot, SnapshotCell},
};

/// Name prefix of the terminal sample stage.
pub const SAMPLE_STAGE: &str = "sample";
