use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Error,
    model::AssetRecord,
    pipeline::{ratio::round2, Origin, RatioStrategy, RawRecord, Stage},
    provider::HTTP,
    types::DashboardPayload,
};

pub const NAME: &str = "dashboard";

pub const STRATEGY: RatioStrategy = RatioStrategy::Quotient { epsilon: 1.0 };

/// Reads another instance's `/api/data`, so a bot-only deployment can
/// follow a web deployment.
#[derive(Debug)]
pub struct DashboardStage {
    http: HTTP,
}

impl DashboardStage {
    pub fn new(http: HTTP) -> Self {
        DashboardStage { http }
    }
}

#[async_trait]
impl Stage for DashboardStage {
    fn name(&self) -> &str {
        NAME
    }

    fn origin(&self) -> Origin {
        Origin::Upstream
    }

    async fn load(&self) -> Result<Vec<AssetRecord>, Error> {
        let payload = self.http.get_dashboard_data().await?;

        if payload.data.is_empty() {
            return Err(Error::UpstreamEmptyPayload(String::from(NAME)));
        }

        Ok(to_records(payload, Utc::now()))
    }
}

/// Keeps the ratio the dashboard already derived; recomputes it only when
/// it is missing or unusable.
pub fn to_records(payload: DashboardPayload, timestamp: DateTime<Utc>) -> Vec<AssetRecord> {
    payload
        .data
        .into_iter()
        .filter_map(|asset| {
            let raw = RawRecord {
                symbol: asset.symbol,
                name: asset.name,
                metric_a: asset.borrow_amount,
                metric_b: asset.repay_amount,
                change_24h: None,
            };
            let mut record = raw.into_record(&STRATEGY, timestamp)?;

            if let Some(ratio) = asset.ratio.filter(|r| r.is_finite() && *r >= 0.0) {
                record.ratio = round2(ratio);
            }

            Some(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_records() {
        let payload: DashboardPayload = serde_json::from_str(
            r#"{"timestamp":"2024-03-01 10:00:00 UTC","data":[
                {"symbol":"BTC","name":"Bitcoin","borrow_amount":3.5e10,"repay_amount":1.2e11,
                 "ratio":41.987,"borrow_formatted":"35.0B"},
                {"symbol":"GALA","borrow_amount":95000000,"repay_amount":5500000},
                {"symbol":"BAD","borrow_amount":10,"repay_amount":1,"ratio":-3}
            ]}"#,
        )
        .unwrap();

        let records = to_records(payload, Utc::now());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].ratio, 41.99);
        assert_eq!(records[0].name.as_deref(), Some("Bitcoin"));
        assert_eq!(records[1].ratio, 17.27);
        assert_eq!(records[2].ratio, 10.0);
    }
}
