//! Unsupervised outlier scoring over the multi-period ratio matrix.
//!
//! The model is fitted per call and dropped on return; the only state is the
//! seeded RNG, so identical inputs and seed give identical scores.

#[cfg(feature = "anomaly")]
pub mod features;
#[cfg(feature = "anomaly")]
pub mod isolation_forest;

#[cfg(feature = "anomaly")]
pub use features::{build_feature_matrix, suppress_immaterial};
#[cfg(feature = "anomaly")]
pub use isolation_forest::IsolationForest;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LiquidityRiskError;
use crate::period::PeriodId;
use crate::LiquidityRiskResult;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How raw isolation scores are mapped onto [0, 1] within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreNormalization {
    #[default]
    MinMax,
    /// Average rank, ties share a position.
    Rank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Expected share of anomalous periods, in [0, 0.5].
    pub contamination: Decimal,
    pub seed: u64,
    /// Fewer periods than this and the model is not fitted.
    pub min_periods: usize,
    pub n_trees: usize,
    /// Subsample size per tree, capped at the number of periods.
    pub max_samples: usize,
    pub normalization: ScoreNormalization,
    /// Feature spreads at or below this share of the ratio's median level are
    /// treated as noise and flattened before fitting. 0 disables.
    pub min_relative_spread: Decimal,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: dec!(0.1),
            seed: 42,
            min_periods: 3,
            n_trees: 100,
            max_samples: 256,
            normalization: ScoreNormalization::MinMax,
            min_relative_spread: dec!(0.05),
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> LiquidityRiskResult<()> {
        if self.contamination < Decimal::ZERO || self.contamination > dec!(0.5) {
            return Err(LiquidityRiskError::config(
                "anomaly.contamination",
                format!("must be within [0, 0.5], got {}", self.contamination),
            ));
        }
        if self.min_periods < 2 {
            return Err(LiquidityRiskError::config(
                "anomaly.min_periods",
                format!("must be at least 2, got {}", self.min_periods),
            ));
        }
        if self.n_trees == 0 {
            return Err(LiquidityRiskError::config(
                "anomaly.n_trees",
                "must be at least 1",
            ));
        }
        if self.max_samples < 2 {
            return Err(LiquidityRiskError::config(
                "anomaly.max_samples",
                format!("must be at least 2, got {}", self.max_samples),
            ));
        }
        if self.min_relative_spread < Decimal::ZERO || self.min_relative_spread >= Decimal::ONE {
            return Err(LiquidityRiskError::config(
                "anomaly.min_relative_spread",
                format!("must be within [0, 1), got {}", self.min_relative_spread),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub period: PeriodId,
    /// Isolation score in (0, 1]; higher is more anomalous.
    pub raw_score: Decimal,
    /// Raw score normalized within the run, in [0, 1].
    pub score: Decimal,
    pub is_outlier: bool,
}

// ---------------------------------------------------------------------------
// Normalization and contamination
// ---------------------------------------------------------------------------

/// Map raw scores onto [0, 1]. When every raw score is equal there is no
/// signal to rank and every normalized score is 0.
pub fn normalize(raw: &[Decimal], method: ScoreNormalization) -> Vec<Decimal> {
    let (min, max) = match (raw.iter().min(), raw.iter().max()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => return Vec::new(),
    };
    if min == max {
        return vec![Decimal::ZERO; raw.len()];
    }

    match method {
        ScoreNormalization::MinMax => {
            let range = max - min;
            raw.iter().map(|x| (*x - min) / range).collect()
        }
        ScoreNormalization::Rank => {
            let mut order: Vec<usize> = (0..raw.len()).collect();
            order.sort_by(|a, b| raw[*a].cmp(&raw[*b]));

            let last = Decimal::from(raw.len() - 1);
            let mut out = vec![Decimal::ZERO; raw.len()];
            let mut i = 0;
            while i < order.len() {
                let mut j = i;
                while j + 1 < order.len() && raw[order[j + 1]] == raw[order[i]] {
                    j += 1;
                }
                // mean of positions i..=j
                let position = Decimal::from(i + j) / Decimal::TWO;
                for &idx in &order[i..=j] {
                    out[idx] = position / last;
                }
                i = j + 1;
            }
            out
        }
    }
}

/// Linear-interpolated quantile of `values` at `q` in [0, 1].
pub fn quantile(values: &[Decimal], q: Decimal) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let rank = q.clamp(Decimal::ZERO, Decimal::ONE) * Decimal::from(sorted.len() - 1);
    let lower = rank.floor();
    let frac = rank - lower;
    let lo = lower.to_usize().unwrap_or(0).min(sorted.len() - 1);
    let hi = (lo + 1).min(sorted.len() - 1);
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Flags raw scores strictly above the (1 - contamination) quantile.
pub fn outlier_flags(raw: &[Decimal], contamination: Decimal) -> Vec<bool> {
    match quantile(raw, Decimal::ONE - contamination) {
        Some(cut) => raw.iter().map(|x| *x > cut).collect(),
        None => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Fit an isolation forest over the run's ratio records and score every
/// period. Results are in input order.
#[cfg(feature = "anomaly")]
pub fn score_anomalies(
    records: &[crate::ratios::RatioRecord],
    config: &AnomalyConfig,
) -> LiquidityRiskResult<Vec<AnomalyResult>> {
    use rust_decimal::prelude::FromPrimitive;
    use tracing::debug;

    if records.len() < config.min_periods {
        return Err(LiquidityRiskError::InsufficientData {
            required: config.min_periods,
            supplied: records.len(),
        });
    }

    let mut matrix = build_feature_matrix(records);
    let flattened = suppress_immaterial(
        &mut matrix,
        config.min_relative_spread.to_f64().unwrap_or(0.0),
    );
    let forest = IsolationForest::fit(&matrix, config.n_trees, config.max_samples, config.seed)?;

    let raw: Vec<Decimal> = matrix
        .iter()
        .map(|row| {
            let s = forest.score(row);
            Decimal::from_f64(s)
                .map(|d| d.round_dp(6))
                .ok_or_else(|| LiquidityRiskError::InvalidInput {
                    field: "anomaly score".into(),
                    reason: format!("non-finite isolation score {s}"),
                })
        })
        .collect::<LiquidityRiskResult<_>>()?;

    let scores = normalize(&raw, config.normalization);
    let outliers = outlier_flags(&raw, config.contamination);

    debug!(
        periods = records.len(),
        trees = config.n_trees,
        sample_size = forest.sample_size(),
        flattened,
        outliers = outliers.iter().filter(|o| **o).count(),
        "isolation forest scored"
    );

    Ok(records
        .iter()
        .zip(raw)
        .zip(scores)
        .zip(outliers)
        .map(|(((record, raw_score), score), is_outlier)| AnomalyResult {
            period: record.period.clone(),
            raw_score,
            score,
            is_outlier,
        })
        .collect())
}
