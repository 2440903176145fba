use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::Error,
    model::AssetRecord,
    pipeline::{Origin, SampleTable, Stage, SAMPLE_STAGE},
};

/// Terminal stage: never fails, never empty.
#[derive(Debug)]
pub struct SampleStage {
    name: String,
    table: SampleTable,
}

impl SampleStage {
    pub fn new(table: SampleTable) -> Self {
        let suffix = match table {
            SampleTable::Web => "web",
            SampleTable::Chat => "chat",
        };

        SampleStage {
            name: format!("{}:{}", SAMPLE_STAGE, suffix),
            table,
        }
    }
}

#[async_trait]
impl Stage for SampleStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> Origin {
        Origin::Fallback
    }

    async fn load(&self) -> Result<Vec<AssetRecord>, Error> {
        Ok(self.table.records(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sample_stage() {
        let stage = SampleStage::new(SampleTable::Chat);
        assert_eq!(stage.name(), "sample:chat");
        assert_eq!(stage.origin(), Origin::Fallback);
        assert_eq!(stage.load().await.unwrap().len(), 10);

        let stage = SampleStage::new(SampleTable::Web);
        assert_eq!(stage.name(), "sample:web");
        assert_eq!(stage.load().await.unwrap().len(), 20);
    }
}
