//! Per-period liquidity ratios and their period-over-period deltas.

pub mod calculator;

pub use calculator::compute_ratios;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LiquidityRiskError;
use crate::period::{Column, PeriodId};
use crate::LiquidityRiskResult;

// ---------------------------------------------------------------------------
// RatioValue
// ---------------------------------------------------------------------------

/// A ratio that is either defined or explicitly undefined. Undefined values
/// are never coerced to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RatioValue {
    Defined(Decimal),
    /// The denominator was zero.
    ZeroDenominator,
    /// The ratio exists arithmetically but its sign cannot be interpreted
    /// (CFO/PAT with non-positive PAT).
    Indeterminate,
    /// First period of the sequence: there is no baseline to diff against.
    NoPriorPeriod,
    /// A delta or trend whose inputs are themselves undefined.
    UndefinedOperand,
}

impl RatioValue {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            RatioValue::Defined(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, RatioValue::Defined(_))
    }

    /// Short reason string for undefined values, `None` when defined.
    pub fn undefined_reason(&self) -> Option<&'static str> {
        match self {
            RatioValue::Defined(_) => None,
            RatioValue::ZeroDenominator => Some("zero_denominator"),
            RatioValue::Indeterminate => Some("indeterminate"),
            RatioValue::NoPriorPeriod => Some("no_prior_period"),
            RatioValue::UndefinedOperand => Some("undefined_operand"),
        }
    }

    /// Division errors are local: they become `ZeroDenominator`.
    pub fn from_division(result: LiquidityRiskResult<Decimal>) -> Self {
        match result {
            Ok(v) => RatioValue::Defined(v),
            Err(_) => RatioValue::ZeroDenominator,
        }
    }

    /// `current - prior`, with `None` meaning there is no prior period.
    pub fn delta(current: RatioValue, prior: Option<RatioValue>) -> Self {
        match prior {
            None => RatioValue::NoPriorPeriod,
            Some(prior) => match (current.value(), prior.value()) {
                (Some(c), Some(p)) => RatioValue::Defined(c - p),
                _ => RatioValue::UndefinedOperand,
            },
        }
    }
}

/// Checked division that reports a zero denominator as `DivisionByZero`.
pub fn divide(
    numerator: Decimal,
    denominator: Decimal,
    context: &str,
) -> LiquidityRiskResult<Decimal> {
    if denominator.is_zero() {
        return Err(LiquidityRiskError::DivisionByZero {
            context: context.to_string(),
        });
    }
    numerator
        .checked_div(denominator)
        .ok_or_else(|| LiquidityRiskError::DivisionByZero {
            context: format!("{context} (overflow)"),
        })
}

// ---------------------------------------------------------------------------
// TACR definition
// ---------------------------------------------------------------------------

/// Which liquidity-structure ratio is used as the cross-check against CR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacrDefinition {
    /// (cash + receivables) / (trade payables + short-term borrowings)
    #[default]
    QuickLiquidity,
    /// total assets / current liabilities
    TotalAssetsCoverage,
}

impl TacrDefinition {
    /// Optional table columns this definition makes mandatory.
    pub fn required_columns(&self) -> &'static [Column] {
        match self {
            TacrDefinition::QuickLiquidity => &[
                Column::Cash,
                Column::TradePayables,
                Column::ShortTermBorrowings,
            ],
            TacrDefinition::TotalAssetsCoverage => &[],
        }
    }

    pub fn formula(&self) -> &'static str {
        match self {
            TacrDefinition::QuickLiquidity => {
                "(cash + receivables) / (trade payables + short-term borrowings)"
            }
            TacrDefinition::TotalAssetsCoverage => "total assets / current liabilities",
        }
    }
}

// ---------------------------------------------------------------------------
// RatioRecord
// ---------------------------------------------------------------------------

/// Names of the ratio features, in the order of [`RatioRecord::features`].
pub const FEATURE_NAMES: [&str; 8] = [
    "current_ratio",
    "tacr",
    "dso",
    "cfo_to_pat",
    "current_ratio_delta",
    "tacr_delta",
    "dso_delta",
    "cfo_to_pat_delta",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioRecord {
    pub period: PeriodId,
    pub current_ratio: RatioValue,
    pub tacr: RatioValue,
    pub dso: RatioValue,
    pub cfo_to_pat: RatioValue,
    pub current_ratio_delta: RatioValue,
    pub tacr_delta: RatioValue,
    pub dso_delta: RatioValue,
    pub cfo_to_pat_delta: RatioValue,
    /// (CFO - prior CFO) / |prior CFO|
    pub cfo_trend: RatioValue,
    /// (PAT - prior PAT) / |prior PAT|
    pub pat_trend: RatioValue,
}

impl RatioRecord {
    /// Levels and deltas, in [`FEATURE_NAMES`] order.
    pub fn features(&self) -> [RatioValue; 8] {
        [
            self.current_ratio,
            self.tacr,
            self.dso,
            self.cfo_to_pat,
            self.current_ratio_delta,
            self.tacr_delta,
            self.dso_delta,
            self.cfo_to_pat_delta,
        ]
    }
}
