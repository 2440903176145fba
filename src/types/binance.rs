use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: Option<String>,
    pub base_asset: String,
    pub quote_asset: String,
}

impl SymbolInfo {
    pub fn is_trading(&self) -> bool {
        self.status.as_deref().unwrap_or("TRADING") == "TRADING"
    }
}

/// `GET /api/v3/klines` row:
/// `[open_time, open, high, low, close, volume, close_time, ...]`,
/// prices and volume as decimal strings.
pub type KlineRow = Vec<Value>;

#[derive(Debug, Clone, Deserialize)]
pub struct MarginMarket {
    #[serde(default)]
    pub data: Vec<MarginAsset>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginAsset {
    pub asset: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_borrowed: f64,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_repaid: f64,
}

/// Accepts `12.5`, `"12.5"` and `null` (as zero).
pub fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("number out of range")),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s.trim().parse().map_err(de::Error::custom),
        Value::Null => Ok(0.0),
        other => Err(de::Error::custom(format!(
            "expected number or numeric string, got {}",
            other
        ))),
    }
}
