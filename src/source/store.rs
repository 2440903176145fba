use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::{
    error::Error,
    model::{AssetRecord, Table},
    pipeline::{Origin, RankPolicy, Sink, Snapshot, Stage},
};

pub const NAME: &str = "store";

/// Latest persisted row per symbol newer than `max_age`, ranked again
/// since rows from several runs are mixed.
#[derive(Debug)]
pub struct StoreStage {
    table: Table<AssetRecord>,
    max_age: Duration,
    policy: RankPolicy,
}

impl StoreStage {
    pub fn new(table: Table<AssetRecord>, max_age: Duration, policy: RankPolicy) -> Self {
        StoreStage {
            table,
            max_age,
            policy,
        }
    }
}

#[async_trait]
impl Stage for StoreStage {
    fn name(&self) -> &str {
        NAME
    }

    fn origin(&self) -> Origin {
        Origin::Fallback
    }

    async fn load(&self) -> Result<Vec<AssetRecord>, Error> {
        let since = Utc::now() - self.max_age;
        let rows = self.table.get_latest_since(since).await?;
        Ok(self.policy.apply(rows))
    }
}

#[async_trait]
impl Sink for Table<AssetRecord> {
    fn name(&self) -> &str {
        "asset_history"
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), Error> {
        self.insert_many(&snapshot.data)
            .await
            .map_err(|e| Error::PersistenceFailure(e.to_string()))
    }
}
