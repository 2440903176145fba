use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::{
    error::Error,
    model::AssetRecord,
    pipeline::{Origin, Stage},
    provider::SnapshotFile,
};

pub const NAME: &str = "cache";

/// Last-known-good snapshot file, accepted only while younger than
/// `max_age`. Its records are returned as they were written.
#[derive(Debug)]
pub struct CacheStage {
    file: SnapshotFile,
    max_age: Duration,
}

impl CacheStage {
    pub fn new(file: SnapshotFile, max_age: Duration) -> Self {
        CacheStage { file, max_age }
    }
}

#[async_trait]
impl Stage for CacheStage {
    fn name(&self) -> &str {
        NAME
    }

    fn origin(&self) -> Origin {
        Origin::Fallback
    }

    async fn load(&self) -> Result<Vec<AssetRecord>, Error> {
        let snapshot = self.file.read().await?;
        let now = Utc::now();

        if !snapshot.is_fresh(self.max_age, now) {
            return Err(Error::StaleSnapshot(format!(
                "{} is {} minutes old",
                self.file.path().display(),
                snapshot.age(now).num_minutes()
            )));
        }

        Ok(snapshot.data)
    }
}
