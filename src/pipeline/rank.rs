use crate::model::AssetRecord;

/// Call-site ranking parameters: the chat surface shows 10 rows, the web
/// surface 20.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankPolicy {
    pub threshold: f64,
    pub limit: usize,
}

impl RankPolicy {
    pub fn new(threshold: f64, limit: usize) -> Self {
        RankPolicy { threshold, limit }
    }

    pub fn apply(&self, records: Vec<AssetRecord>) -> Vec<AssetRecord> {
        rank(records, self.threshold, self.limit)
    }
}

/// Sorts by ratio descending (stable), keeps `ratio > threshold` and
/// truncates to `limit`. When nothing clears the threshold the unfiltered
/// top `limit` is returned, so a non-empty input never ranks to empty.
pub fn rank(
    mut records: Vec<AssetRecord>,
    threshold: f64,
    limit: usize,
) -> Vec<AssetRecord> {
    records.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));

    let passing = records
        .iter()
        .filter(|record| record.ratio > threshold)
        .count();

    if passing > 0 {
        records.retain(|record| record.ratio > threshold);
    }

    records.truncate(limit);
    records
}
