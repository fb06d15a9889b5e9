use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LiquidityRiskError;
use crate::types::Score;
use crate::LiquidityRiskResult;

/// Ordered risk severity: Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskBucket {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBucket {
    pub const ALL: [RiskBucket; 4] = [
        RiskBucket::Low,
        RiskBucket::Medium,
        RiskBucket::High,
        RiskBucket::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBucket::Low => "Low",
            RiskBucket::Medium => "Medium",
            RiskBucket::High => "High",
            RiskBucket::Critical => "Critical",
        }
    }

    /// High and Critical periods.
    pub fn is_high_risk(&self) -> bool {
        *self >= RiskBucket::High
    }
}

impl fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lower bounds of the Medium, High and Critical buckets on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketBoundaries {
    pub medium: Score,
    pub high: Score,
    pub critical: Score,
}

impl Default for BucketBoundaries {
    fn default() -> Self {
        Self {
            medium: dec!(25),
            high: dec!(50),
            critical: dec!(75),
        }
    }
}

impl BucketBoundaries {
    pub fn validate(&self) -> LiquidityRiskResult<()> {
        let hundred = dec!(100);
        if !(Decimal::ZERO < self.medium
            && self.medium < self.high
            && self.high < self.critical
            && self.critical < hundred)
        {
            return Err(LiquidityRiskError::config(
                "aggregation.buckets",
                format!(
                    "boundaries must be strictly increasing within (0, 100), got {}/{}/{}",
                    self.medium, self.high, self.critical
                ),
            ));
        }
        Ok(())
    }

    /// Lower bounds are inclusive: a score equal to `high` is High.
    pub fn classify(&self, score: Score) -> RiskBucket {
        if score >= self.critical {
            RiskBucket::Critical
        } else if score >= self.high {
            RiskBucket::High
        } else if score >= self.medium {
            RiskBucket::Medium
        } else {
            RiskBucket::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_boundaries() {
        let b = BucketBoundaries::default();
        assert_eq!(b.classify(dec!(0)), RiskBucket::Low);
        assert_eq!(b.classify(dec!(24.99)), RiskBucket::Low);
        assert_eq!(b.classify(dec!(25)), RiskBucket::Medium);
        assert_eq!(b.classify(dec!(50)), RiskBucket::High);
        assert_eq!(b.classify(dec!(74.99)), RiskBucket::High);
        assert_eq!(b.classify(dec!(75)), RiskBucket::Critical);
        assert_eq!(b.classify(dec!(100)), RiskBucket::Critical);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let b = BucketBoundaries::default();
        let mut prev = RiskBucket::Low;
        for step in 0..=10_000 {
            let score = Decimal::new(step, 2);
            let bucket = b.classify(score);
            assert!(bucket >= prev, "bucket fell at {score}");
            prev = bucket;
        }
    }

    #[test]
    fn test_invalid_boundaries() {
        let b = BucketBoundaries {
            medium: dec!(50),
            high: dec!(50),
            critical: dec!(75),
        };
        assert!(b.validate().is_err());
        let b = BucketBoundaries {
            medium: dec!(25),
            high: dec!(50),
            critical: dec!(100),
        };
        assert!(b.validate().is_err());
        assert!(BucketBoundaries::default().validate().is_ok());
    }

    #[test]
    fn test_high_risk() {
        assert!(!RiskBucket::Medium.is_high_risk());
        assert!(RiskBucket::High.is_high_risk());
        assert!(RiskBucket::Critical.is_high_risk());
    }
}
