use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::model::AssetRecord;

/// One complete ranked list plus the moment it was observed.
///
/// This is also the on-disk cache layout: `{timestamp, data}`, with the
/// producing stage recorded when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub data: Vec<AssetRecord>,
}

impl Snapshot {
    pub fn new(source: &str, data: Vec<AssetRecord>) -> Self {
        Snapshot {
            timestamp: Utc::now(),
            source: Some(source.to_owned()),
            data,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) < max_age
    }

    pub fn is_sample(&self) -> bool {
        self.source
            .as_deref()
            .map(|source| source.starts_with(super::SAMPLE_STAGE))
            .unwrap_or(false)
    }
}

/// Owned holder of the latest snapshot of one pipeline.
///
/// Writers replace the whole `Arc`, so readers see either the previous or
/// the next snapshot.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    inner: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        SnapshotCell::default()
    }

    pub async fn store(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut inner = self.inner.write().await;
        *inner = Some(snapshot.clone());
        snapshot
    }

    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.inner.read().await.clone()
    }

    /// The held snapshot if it is younger than `max_age`.
    pub async fn fresh(&self, max_age: Duration) -> Option<Arc<Snapshot>> {
        let now = Utc::now();
        self.current()
            .await
            .filter(|snapshot| snapshot.is_fresh(max_age, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_age() {
        let mut snapshot = Snapshot::new("coingecko", vec![]);
        let now = Utc::now();
        snapshot.timestamp = now - Duration::minutes(10);

        assert!(snapshot.is_fresh(Duration::hours(1), now));
        assert!(!snapshot.is_fresh(Duration::minutes(5), now));
    }

    #[test]
    fn test_cache_layout_without_source() {
        let body = r#"{"timestamp":"2024-03-01T10:00:00Z","data":[]}"#;
        let snapshot: Snapshot = serde_json::from_str(body).unwrap();
        assert!(snapshot.source.is_none());
        assert!(snapshot.data.is_empty());
        assert!(!snapshot.is_sample());
    }

    #[tokio::test]
    async fn test_cell_staleness() {
        let cell = SnapshotCell::new();
        assert!(cell.current().await.is_none());

        let mut old = Snapshot::new("binance", vec![]);
        old.timestamp = Utc::now() - Duration::hours(2);
        cell.store(old).await;

        assert!(cell.current().await.is_some());
        assert!(cell.fresh(Duration::hours(1)).await.is_none());

        cell.store(Snapshot::new("coingecko", vec![])).await;
        let fresh = cell.fresh(Duration::hours(1)).await.unwrap();
        assert_eq!(fresh.source.as_deref(), Some("coingecko"));
    }
}
