//! Hardcoded demonstration tables served when every live and persisted
//! stage has failed. Not real market data.

use chrono::{DateTime, Utc};

use super::ratio::{RatioStrategy, RawRecord};
use crate::model::AssetRecord;

type Row = (&'static str, &'static str, f64, f64);

const EPSILON: f64 = 1.0;

const WEB_TABLE: [Row; 20] = [
    ("APE", "ApeCoin", 320_000_000.0, 16_000_000.0),
    ("SHIB", "Shiba Inu", 456_000_000.0, 25_000_000.0),
    ("GALA", "Gala", 95_000_000.0, 5_500_000.0),
    ("AXS", "Axie Infinity", 167_500_000.0, 10_500_000.0),
    ("SAND", "The Sandbox", 125_000_000.0, 8_500_000.0),
    ("MANA", "Decentraland", 230_000_000.0, 17_000_000.0),
    ("NEAR", "NEAR Protocol", 142_500_000.0, 11_500_000.0),
    ("MATIC", "Polygon", 274_000_000.0, 24_000_000.0),
    ("ALGO", "Algorand", 155_000_000.0, 14_000_000.0),
    ("DOGE", "Dogecoin", 198_000_000.0, 18_000_000.0),
    ("DOT", "Polkadot", 187_000_000.0, 17_000_000.0),
    ("AVAX", "Avalanche", 165_000_000.0, 15_000_000.0),
    ("SOL", "Solana", 242_000_000.0, 22_000_000.0),
    ("LINK", "Chainlink", 154_000_000.0, 14_000_000.0),
    ("XRP", "XRP", 209_000_000.0, 19_000_000.0),
    ("UNI", "Uniswap", 143_000_000.0, 13_000_000.0),
    ("ADA", "Cardano", 132_000_000.0, 12_000_000.0),
    ("FTM", "Fantom", 176_000_000.0, 16_200_000.0),
    ("ATOM", "Cosmos", 183_500_000.0, 17_300_000.0),
    ("ONE", "Harmony", 92_800_000.0, 8_900_000.0),
];

const CHAT_TABLE: [Row; 10] = [
    ("APE", "ApeCoin", 320_000_000.0, 16_000_000.0),
    ("SHIB", "Shiba Inu", 456_000_000.0, 25_000_000.0),
    ("GALA", "Gala", 95_000_000.0, 5_500_000.0),
    ("AXS", "Axie Infinity", 167_500_000.0, 10_500_000.0),
    ("SAND", "The Sandbox", 125_000_000.0, 8_500_000.0),
    ("MANA", "Decentraland", 230_000_000.0, 17_000_000.0),
    ("NEAR", "NEAR Protocol", 142_500_000.0, 11_500_000.0),
    ("FTM", "Fantom", 176_000_000.0, 16_200_000.0),
    ("ATOM", "Cosmos", 183_500_000.0, 17_300_000.0),
    ("ONE", "Harmony", 92_800_000.0, 8_900_000.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleTable {
    Web,
    Chat,
}

impl SampleTable {
    pub fn records(&self, timestamp: DateTime<Utc>) -> Vec<AssetRecord> {
        let rows: &[Row] = match self {
            SampleTable::Web => &WEB_TABLE,
            SampleTable::Chat => &CHAT_TABLE,
        };

        let strategy = RatioStrategy::Quotient { epsilon: EPSILON };

        rows.iter()
            .filter_map(|(symbol, name, borrow, repay)| {
                RawRecord {
                    symbol: symbol.to_string(),
                    name: Some(name.to_string()),
                    metric_a: *borrow,
                    metric_b: *repay,
                    change_24h: None,
                }
                .into_record(&strategy, timestamp)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes() {
        let now = Utc::now();
        assert_eq!(SampleTable::Web.records(now).len(), 20);
        assert_eq!(SampleTable::Chat.records(now).len(), 10);
    }

    #[test]
    fn test_tables_are_ranked() {
        let now = Utc::now();
        for table in [SampleTable::Web, SampleTable::Chat] {
            let records = table.records(now);
            assert!(records.windows(2).all(|w| w[0].ratio >= w[1].ratio));
            assert!(records.iter().all(|r| r.ratio > 10.0));
        }
    }

    #[test]
    fn test_known_ratios() {
        let records = SampleTable::Web.records(Utc::now());
        let ratio = |symbol: &str| {
            records
                .iter()
                .find(|r| r.symbol == symbol)
                .map(|r| r.ratio)
                .unwrap()
        };

        assert_eq!(ratio("APE"), 20.0);
        assert_eq!(ratio("MATIC"), 11.42);
        assert_eq!(ratio("ONE"), 10.43);
    }
}
