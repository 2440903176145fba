use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use futures::future::join_all;
use tracing::{error, info, warn};

use super::{
    rank::RankPolicy,
    snapshot::{Snapshot, SnapshotCell},
};
use crate::{error::Error, model::AssetRecord};

/// Where a stage's records come from. Only upstream results are ranked and
/// persisted; fallback stages hand back what was already persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Upstream,
    Fallback,
}

/// One step of the fallback chain: fetch-or-fail, a single attempt per run.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn origin(&self) -> Origin;

    async fn load(&self) -> Result<Vec<AssetRecord>, Error>;
}

/// Destination for freshly fetched snapshots.
#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), Error>;
}

/// Generic fallback orchestrator over an ordered list of stages.
pub struct Pipeline {
    name: String,
    stages: Vec<Box<dyn Stage>>,
    sinks: Vec<Box<dyn Sink>>,
    policy: RankPolicy,
    snapshot: SnapshotCell,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Pipeline {
    pub fn new(name: &str, policy: RankPolicy) -> Self {
        Pipeline {
            name: name.to_owned(),
            stages: vec![],
            sinks: vec![],
            policy,
            snapshot: SnapshotCell::new(),
        }
    }

    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> RankPolicy {
        self.policy
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Evaluates the stages in order and returns the first non-empty result.
    pub async fn run(&self) -> Result<Arc<Snapshot>, Error> {
        if self.stages.is_empty() {
            return Err(Error::NoStages(self.name.to_owned()));
        }

        let mut last_error = None;

        for stage in &self.stages {
            let records = match stage.load().await {
                Ok(records) if records.is_empty() => {
                    warn!(
                        "[{}] stage {} returned no records",
                        self.name,
                        stage.name()
                    );
                    last_error = Some(Error::UpstreamEmptyPayload(
                        stage.name().to_owned(),
                    ));
                    continue;
                },
                Ok(records) => records,
                Err(err) => {
                    warn!("[{}] stage {} failed: {}", self.name, stage.name(), err);
                    last_error = Some(err);
                    continue;
                },
            };

            let snapshot = match stage.origin() {
                Origin::Upstream => {
                    let snapshot =
                        Snapshot::new(stage.name(), self.policy.apply(records));
                    self.persist(&snapshot).await;
                    snapshot
                },
                Origin::Fallback => Snapshot::new(stage.name(), records),
            };

            info!(
                "[{}] serving {} records from {}",
                self.name,
                snapshot.data.len(),
                stage.name()
            );

            return Ok(self.snapshot.store(snapshot).await);
        }

        Err(last_error.unwrap_or_else(|| Error::NoStages(self.name.to_owned())))
    }

    /// The held snapshot when younger than `max_age`, a fresh run otherwise.
    pub async fn latest(&self, max_age: Duration) -> Result<Arc<Snapshot>, Error> {
        if let Some(snapshot) = self.snapshot.fresh(max_age).await {
            return Ok(snapshot);
        }

        self.run().await
    }

    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.current().await
    }

    async fn persist(&self, snapshot: &Snapshot) {
        let writes = self.sinks.iter().map(|sink| async move {
            (sink.name(), sink.persist(snapshot).await)
        });

        for (sink, result) in join_all(writes).await {
            if let Err(err) = result {
                error!("[{}] could not persist to {}: {}", self.name, sink, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use chrono::Utc;

    use super::*;
    use crate::{
        pipeline::{sample::SampleTable, SAMPLE_STAGE},
        provider::SnapshotFile,
        source::{CacheStage, SampleStage},
    };

    fn record(symbol: &str, ratio: f64) -> AssetRecord {
        AssetRecord {
            symbol: symbol.to_owned(),
            name: None,
            borrow_amount: ratio * 10.0,
            repay_amount: 10.0,
            ratio,
            timestamp: Utc::now(),
        }
    }

    enum Behaviour {
        Fail,
        Empty,
        Records(Vec<AssetRecord>),
    }

    struct FakeStage {
        name: &'static str,
        origin: Origin,
        behaviour: Behaviour,
        calls: Arc<AtomicUsize>,
    }

    impl FakeStage {
        fn boxed(
            name: &'static str,
            origin: Origin,
            behaviour: Behaviour,
        ) -> (Box<dyn Stage>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let stage = FakeStage {
                name,
                origin,
                behaviour,
                calls: calls.clone(),
            };
            (Box::new(stage), calls)
        }
    }

    #[async_trait]
    impl Stage for FakeStage {
        fn name(&self) -> &str {
            self.name
        }

        fn origin(&self) -> Origin {
            self.origin
        }

        async fn load(&self) -> Result<Vec<AssetRecord>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Fail => Err(Error::UpstreamUnavailable(format!(
                    "{} is down",
                    self.name
                ))),
                Behaviour::Empty => Ok(vec![]),
                Behaviour::Records(records) => Ok(records.clone()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        written: Arc<Mutex<Vec<Snapshot>>>,
    }

    #[async_trait]
    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn persist(&self, snapshot: &Snapshot) -> Result<(), Error> {
            if let Ok(mut written) = self.written.lock() {
                written.push(snapshot.clone());
            }
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl Sink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn persist(&self, _snapshot: &Snapshot) -> Result<(), Error> {
            Err(Error::PersistenceFailure(String::from("disk full")))
        }
    }

    #[tokio::test]
    async fn test_falls_through_to_sample() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("cache.json"));

        let mut stale = Snapshot::new("coingecko", vec![record("OLD", 50.0)]);
        stale.timestamp = Utc::now() - Duration::hours(2);
        file.write(&stale).await.unwrap();

        for (table, limit, expected) in
            [(SampleTable::Chat, 10, 10), (SampleTable::Web, 20, 20)]
        {
            let (primary, _) =
                FakeStage::boxed("primary", Origin::Upstream, Behaviour::Fail);
            let (secondary, _) =
                FakeStage::boxed("secondary", Origin::Upstream, Behaviour::Empty);
            let (store, _) =
                FakeStage::boxed("store", Origin::Fallback, Behaviour::Empty);

            let pipeline = Pipeline::new("test", RankPolicy::new(10.0, limit))
                .with_stage(primary)
                .with_stage(secondary)
                .with_stage(Box::new(CacheStage::new(
                    file.clone(),
                    Duration::hours(1),
                )))
                .with_stage(store)
                .with_stage(Box::new(SampleStage::new(table)));

            let snapshot = pipeline.run().await.unwrap();
            assert_eq!(snapshot.data.len(), expected);
            assert!(snapshot.is_sample());
            assert!(snapshot
                .source
                .as_deref()
                .unwrap()
                .starts_with(SAMPLE_STAGE));
        }
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_secondary() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("cache.json"));

        let mut cached = Snapshot::new(
            "coingecko",
            vec![record("LOW", 3.0), record("HIGH", 30.0)],
        );
        cached.timestamp = Utc::now() - Duration::minutes(10);
        file.write(&cached).await.unwrap();

        let (primary, _) =
            FakeStage::boxed("primary", Origin::Upstream, Behaviour::Fail);
        let (secondary, secondary_calls) = FakeStage::boxed(
            "secondary",
            Origin::Upstream,
            Behaviour::Records(vec![record("NEW", 99.0)]),
        );

        let pipeline = Pipeline::new("test", RankPolicy::new(10.0, 20))
            .with_stage(primary)
            .with_stage(Box::new(CacheStage::new(file, Duration::hours(1))))
            .with_stage(secondary);

        let snapshot = pipeline.run().await.unwrap();
        assert_eq!(snapshot.data, cached.data);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_success_is_ranked_and_persisted() {
        let sink = RecordingSink::default();
        let written = sink.written.clone();

        let (primary, _) = FakeStage::boxed(
            "primary",
            Origin::Upstream,
            Behaviour::Records(vec![
                record("A", 12.0),
                record("B", 2.0),
                record("C", 40.0),
            ]),
        );
        let (secondary, secondary_calls) =
            FakeStage::boxed("secondary", Origin::Upstream, Behaviour::Fail);

        let pipeline = Pipeline::new("test", RankPolicy::new(10.0, 20))
            .with_stage(primary)
            .with_stage(secondary)
            .with_sink(Box::new(sink))
            .with_sink(Box::new(FailingSink));

        let snapshot = pipeline.run().await.unwrap();
        let symbols: Vec<&str> =
            snapshot.data.iter().map(|r| r.symbol.as_str()).collect();

        assert_eq!(symbols, vec!["C", "A"]);
        assert_eq!(snapshot.source.as_deref(), Some("primary"));
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].data, snapshot.data);
    }

    #[tokio::test]
    async fn test_fallback_results_are_not_persisted() {
        let sink = RecordingSink::default();
        let written = sink.written.clone();

        let (primary, _) =
            FakeStage::boxed("primary", Origin::Upstream, Behaviour::Fail);

        let pipeline = Pipeline::new("test", RankPolicy::new(10.0, 10))
            .with_stage(primary)
            .with_stage(Box::new(SampleStage::new(SampleTable::Chat)))
            .with_sink(Box::new(sink));

        pipeline.run().await.unwrap();
        assert!(written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_stages_is_an_error() {
        let pipeline = Pipeline::new("web", RankPolicy::new(10.0, 20));
        let result = pipeline.run().await;
        assert!(matches!(result, Err(Error::NoStages(_))));
    }

    #[tokio::test]
    async fn test_exhausted_stages_return_last_error() {
        let (primary, _) =
            FakeStage::boxed("primary", Origin::Upstream, Behaviour::Fail);
        let (secondary, _) =
            FakeStage::boxed("secondary", Origin::Upstream, Behaviour::Empty);

        let pipeline = Pipeline::new("test", RankPolicy::new(10.0, 20))
            .with_stage(primary)
            .with_stage(secondary);

        let result = pipeline.run().await;
        assert!(matches!(result, Err(Error::UpstreamEmptyPayload(_))));
    }

    #[tokio::test]
    async fn test_latest_reuses_fresh_snapshot() {
        let (primary, calls) = FakeStage::boxed(
            "primary",
            Origin::Upstream,
            Behaviour::Records(vec![record("A", 12.0)]),
        );

        let pipeline = Pipeline::new("test", RankPolicy::new(10.0, 20))
            .with_stage(primary);

        pipeline.latest(Duration::minutes(30)).await.unwrap();
        pipeline.latest(Duration::minutes(30)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        pipeline.latest(Duration::zero()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(pipeline.current().await.is_some());
    }
}
