//! Composite Liquidity Risk Score and bucket mapping.

pub mod aggregator;
pub mod buckets;

pub use aggregator::aggregate;
pub use buckets::{BucketBoundaries, RiskBucket};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LiquidityRiskError;
use crate::period::PeriodId;
use crate::types::Score;
use crate::LiquidityRiskResult;

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Named anomaly/rule weight splits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPreset {
    #[default]
    Ai60Flags40,
    Ai50Flags50,
    Ai70Flags30,
}

impl WeightPreset {
    /// `(rule_weight, anomaly_weight)`
    pub fn weights(&self) -> (Decimal, Decimal) {
        match self {
            WeightPreset::Ai60Flags40 => (dec!(0.4), dec!(0.6)),
            WeightPreset::Ai50Flags50 => (dec!(0.5), dec!(0.5)),
            WeightPreset::Ai70Flags30 => (dec!(0.3), dec!(0.7)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightPreset::Ai60Flags40 => "ai60_flags40",
            WeightPreset::Ai50Flags50 => "ai50_flags50",
            WeightPreset::Ai70Flags30 => "ai70_flags30",
        }
    }
}

impl fmt::Display for WeightPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WeightPreset {
    type Err = LiquidityRiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ai60_flags40" => Ok(WeightPreset::Ai60Flags40),
            "ai50_flags50" => Ok(WeightPreset::Ai50Flags50),
            "ai70_flags30" => Ok(WeightPreset::Ai70Flags30),
            other => Err(LiquidityRiskError::InvalidInput {
                field: "weights".into(),
                reason: format!(
                    "unknown preset '{other}', expected ai60_flags40, ai50_flags50 or ai70_flags30"
                ),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub rule_weight: Decimal,
    pub anomaly_weight: Decimal,
    pub buckets: BucketBoundaries,
    /// Score from rules alone when the anomaly model cannot be fitted.
    pub allow_missing_anomaly: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self::with_preset(WeightPreset::default())
    }
}

impl AggregationConfig {
    pub fn with_preset(preset: WeightPreset) -> Self {
        let (rule_weight, anomaly_weight) = preset.weights();
        Self {
            rule_weight,
            anomaly_weight,
            buckets: BucketBoundaries::default(),
            allow_missing_anomaly: false,
        }
    }

    pub fn apply_preset(&mut self, preset: WeightPreset) {
        let (rule_weight, anomaly_weight) = preset.weights();
        self.rule_weight = rule_weight;
        self.anomaly_weight = anomaly_weight;
    }

    pub fn validate(&self) -> LiquidityRiskResult<()> {
        for (field, w) in [
            ("aggregation.rule_weight", self.rule_weight),
            ("aggregation.anomaly_weight", self.anomaly_weight),
        ] {
            if w < Decimal::ZERO || w > Decimal::ONE {
                return Err(LiquidityRiskError::config(
                    field,
                    format!("must be within [0, 1], got {w}"),
                ));
            }
        }
        let sum = self.rule_weight + self.anomaly_weight;
        if sum != Decimal::ONE {
            return Err(LiquidityRiskError::config(
                "aggregation.weights",
                format!("rule_weight + anomaly_weight must equal 1, got {sum}"),
            ));
        }
        self.buckets.validate()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Composite score for one period. Contributions are on the 0-100 scale and
/// sum to the composite before rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub period: PeriodId,
    pub composite: Score,
    /// Triggered rules over active rules.
    pub rule_severity: Decimal,
    pub rule_contribution: Score,
    /// Absent on degraded runs.
    pub anomaly_contribution: Option<Score>,
    pub bucket: RiskBucket,
    pub degraded: bool,
}
