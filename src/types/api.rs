use serde::{Deserialize, Serialize};

use crate::{
    helpers::{format_large_number, format_utc},
    model::AssetRecord,
    pipeline::{history::DailyRanking, Snapshot},
};

/// Body of `GET /api/data`.
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub data: Vec<AssetView>,
}

impl From<&Snapshot> for DataResponse {
    fn from(snapshot: &Snapshot) -> Self {
        DataResponse {
            timestamp: format_utc(&snapshot.timestamp),
            source: snapshot.source.to_owned(),
            data: snapshot.data.iter().map(AssetView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssetView {
    #[serde(flatten)]
    pub record: AssetRecord,
    pub borrow_formatted: String,
    pub repay_formatted: String,
}

impl From<&AssetRecord> for AssetView {
    fn from(record: &AssetRecord) -> Self {
        AssetView {
            borrow_formatted: format_large_number(record.borrow_amount, 1),
            repay_formatted: format_large_number(record.repay_amount, 1),
            record: record.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub days: i64,
    pub data: Vec<DailyRanking>,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// What the dashboard adapter reads back from another instance's
/// `/api/data`. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardPayload {
    #[serde(default)]
    pub data: Vec<DashboardAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardAsset {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    pub borrow_amount: f64,
    pub repay_amount: f64,
    #[serde(default)]
    pub ratio: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_data_response_shape() {
        let mut snapshot = Snapshot::new(
            "coingecko",
            vec![AssetRecord {
                symbol: String::from("APE"),
                name: Some(String::from("ApeCoin")),
                borrow_amount: 320_000_000.0,
                repay_amount: 16_000_000.0,
                ratio: 20.0,
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            }],
        );
        snapshot.timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        let value = serde_json::to_value(DataResponse::from(&snapshot)).unwrap();

        assert_eq!(value["timestamp"], "2024-03-01 10:00:00 UTC");
        assert_eq!(value["source"], "coingecko");
        assert_eq!(value["data"][0]["symbol"], "APE");
        assert_eq!(value["data"][0]["ratio"], 20.0);
        assert_eq!(value["data"][0]["borrow_formatted"], "320.0M");
        assert_eq!(value["data"][0]["repay_formatted"], "16.0M");
    }

    #[test]
    fn test_parse_dashboard_payload() {
        let body = r#"{"timestamp":"2024-03-01 10:00:00 UTC","data":[
            {"symbol":"APE","name":"ApeCoin","borrow_amount":320000000,"repay_amount":16000000,
             "ratio":20,"borrow_formatted":"320.0M"},
            {"symbol":"GALA","borrow_amount":95000000,"repay_amount":5500000}
        ]}"#;

        let payload: DashboardPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.data.len(), 2);
        assert_eq!(payload.data[0].ratio, Some(20.0));
        assert!(payload.data[1].name.is_none());
        assert!(payload.data[1].ratio.is_none());
    }
}
