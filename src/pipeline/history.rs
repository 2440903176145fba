use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::rank::RankPolicy;
use crate::model::AssetRecord;

#[derive(Debug, Clone, Serialize)]
pub struct DailyRanking {
    pub date: NaiveDate,
    pub data: Vec<AssetRecord>,
}

/// Buckets history rows by UTC calendar day, keeps the latest row per
/// symbol and ranks each day on its own.
pub fn group_by_day(rows: Vec<AssetRecord>, policy: RankPolicy) -> Vec<DailyRanking> {
    let mut days: BTreeMap<NaiveDate, BTreeMap<String, AssetRecord>> =
        BTreeMap::new();

    for row in rows {
        let symbols = days.entry(row.timestamp.date_naive()).or_default();

        let newer = symbols
            .get(&row.symbol)
            .map_or(true, |kept| kept.timestamp <= row.timestamp);

        if newer {
            symbols.insert(row.symbol.to_owned(), row);
        }
    }

    days.into_iter()
        .map(|(date, symbols)| DailyRanking {
            date,
            data: policy.apply(symbols.into_values().collect()),
        })
        .collect()
}

/// `days` query value clamped to `1..=max_days`, defaulting to 7.
pub fn clamp_days(days: Option<i64>, max_days: i64) -> i64 {
    days.unwrap_or(7).clamp(1, max_days.max(1))
}
