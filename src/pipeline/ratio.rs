//! Leverage indicator derivation.
//!
//! Every adapter owns its strategy; the orchestrator never assumes a single
//! formula.

use chrono::{DateTime, Utc};

use crate::model::AssetRecord;

/// Adapter-neutral intermediate shape produced by source adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub symbol: String,
    pub name: Option<String>,
    /// Plays the role of `borrow_amount`.
    pub metric_a: f64,
    /// Plays the role of `repay_amount`, the divisor.
    pub metric_b: f64,
    pub change_24h: Option<f64>,
}

impl RawRecord {
    pub fn new(symbol: &str, metric_a: f64, metric_b: f64) -> Self {
        RawRecord {
            symbol: symbol.to_owned(),
            name: None,
            metric_a,
            metric_b,
            change_24h: None,
        }
    }

    /// Normalizes the record and derives its ratio.
    ///
    /// Returns `None` for an empty symbol or non-finite metrics. A negative
    /// `metric_a` is clamped to zero, a non-positive `metric_b` is replaced by
    /// the strategy's epsilon.
    pub fn into_record(
        self,
        strategy: &RatioStrategy,
        timestamp: DateTime<Utc>,
    ) -> Option<AssetRecord> {
        let symbol = self.symbol.trim().to_uppercase();

        if symbol.is_empty()
            || !self.metric_a.is_finite()
            || !self.metric_b.is_finite()
        {
            return None;
        }

        let borrow_amount = self.metric_a.max(0.0);
        let repay_amount = divisor(self.metric_b, strategy.epsilon());
        let ratio = strategy.apply(borrow_amount, repay_amount, self.change_24h);

        if !ratio.is_finite() {
            return None;
        }

        Some(AssetRecord {
            symbol,
            name: self.name.filter(|name| !name.trim().is_empty()),
            borrow_amount,
            repay_amount,
            ratio,
            timestamp,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioStrategy {
    /// `metric_a / metric_b`.
    Quotient { epsilon: f64 },
    /// `metric_a / metric_b * scale * (1 + |change_24h| / 100)`.
    VolatilityAdjusted { epsilon: f64, scale: f64 },
}

impl RatioStrategy {
    pub fn epsilon(&self) -> f64 {
        match self {
            RatioStrategy::Quotient { epsilon } => *epsilon,
            RatioStrategy::VolatilityAdjusted { epsilon, .. } => *epsilon,
        }
    }

    pub fn apply(
        &self,
        metric_a: f64,
        metric_b: f64,
        change_24h: Option<f64>,
    ) -> f64 {
        match self {
            RatioStrategy::Quotient { epsilon } => {
                derive(metric_a, metric_b, *epsilon)
            },
            RatioStrategy::VolatilityAdjusted { epsilon, scale } => {
                let change = change_24h
                    .filter(|value| value.is_finite())
                    .map(f64::abs)
                    .unwrap_or(0.0);
                let quotient = metric_a.max(0.0) / divisor(metric_b, *epsilon);
                clamp(round2(quotient * scale * (1.0 + change / 100.0)))
            },
        }
    }
}

/// Default derivation rule: `metric_a / metric_b` rounded to two decimals,
/// with `epsilon` standing in for a non-positive divisor.
pub fn derive(metric_a: f64, metric_b: f64, epsilon: f64) -> f64 {
    clamp(round2(metric_a.max(0.0) / divisor(metric_b, epsilon)))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn divisor(value: f64, epsilon: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        epsilon
    }
}

fn clamp(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_plain_quotient() {
        assert_eq!(derive(320_000_000.0, 16_000_000.0, 1.0), 20.0);
        assert_eq!(derive(456_000_000.0, 25_000_000.0, 1.0), 18.24);
        assert_eq!(derive(125_000_000.0, 8_500_000.0, 1.0), 14.71);
    }

    #[test]
    fn test_derive_substitutes_epsilon() {
        assert_eq!(derive(5.0, 0.0, 1.0), 5.0);
        assert_eq!(derive(5.0, -3.0, 0.1), 50.0);
        assert_eq!(derive(0.0, 0.0, 0.1), 0.0);
    }

    #[test]
    fn test_derive_never_negative() {
        assert_eq!(derive(-10.0, 2.0, 1.0), 0.0);
    }

    #[test]
    fn test_volatility_adjusted() {
        let strategy = RatioStrategy::VolatilityAdjusted {
            epsilon: 0.1,
            scale: 10.0,
        };

        // volume 50M, market cap 100M (metric_b = 10M), +20% change
        let ratio = strategy.apply(50_000_000.0, 10_000_000.0, Some(20.0));
        assert_eq!(ratio, 60.0);

        let ratio = strategy.apply(50_000_000.0, 10_000_000.0, Some(-20.0));
        assert_eq!(ratio, 60.0);

        let ratio = strategy.apply(50_000_000.0, 10_000_000.0, None);
        assert_eq!(ratio, 50.0);
    }

    #[test]
    fn test_into_record_normalizes() {
        let now = Utc::now();
        let raw = RawRecord {
            symbol: String::from(" btc "),
            name: Some(String::from("Bitcoin")),
            metric_a: 10.0,
            metric_b: 0.0,
            change_24h: None,
        };

        let record = raw
            .into_record(&RatioStrategy::Quotient { epsilon: 1.0 }, now)
            .unwrap();

        assert_eq!(record.symbol, "BTC");
        assert_eq!(record.repay_amount, 1.0);
        assert_eq!(record.ratio, 10.0);
        assert_eq!(record.timestamp, now);
    }

    #[test]
    fn test_into_record_discards_bad_input() {
        let strategy = RatioStrategy::Quotient { epsilon: 1.0 };
        let now = Utc::now();

        assert!(RawRecord::new("", 1.0, 1.0).into_record(&strategy, now).is_none());
        assert!(RawRecord::new("ETH", f64::NAN, 1.0)
            .into_record(&strategy, now)
            .is_none());
        assert!(RawRecord::new("ETH", 1.0, f64::INFINITY)
            .into_record(&strategy, now)
            .is_none());

        let record = RawRecord::new("ETH", -5.0, 1.0)
            .into_record(&strategy, now)
            .unwrap();
        assert_eq!(record.borrow_amount, 0.0);
        assert_eq!(record.ratio, 0.0);
    }

    #[test]
    fn test_ratio_finite_for_extreme_values() {
        let strategy = RatioStrategy::VolatilityAdjusted {
            epsilon: 0.1,
            scale: 10.0,
        };
        let ratio = strategy.apply(f64::MAX, 0.0, Some(f64::MAX));
        assert!(ratio.is_finite());
        assert!(ratio >= 0.0);
    }
}
