use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One ranked observation of an asset's leverage indicator.
///
/// Records are built once per polling cycle and never mutated afterwards;
/// the same shape is written to the snapshot file, appended to
/// `asset_history` and returned by `/api/data`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AssetRecord {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    pub borrow_amount: f64,
    pub repay_amount: f64,
    pub ratio: f64,
    pub timestamp: DateTime<Utc>,
}
