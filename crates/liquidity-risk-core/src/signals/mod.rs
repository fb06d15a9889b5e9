//! Rule-based drift signals over ratio records.
//!
//! Every rule is a descriptor (id, threshold, comparator, observer) built from
//! [`SignalThresholds`]; the detector evaluates each descriptor independently
//! for every period. A rule whose inputs are undefined reports
//! `not_evaluable`, which is distinct from a rule that did not trigger.

pub mod detector;
pub mod rules;

pub use detector::detect_signals;
pub use rules::{rule_table, Comparator, Observation, SignalRule};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LiquidityRiskError;
use crate::period::PeriodId;
use crate::types::{Days, Multiple};
use crate::LiquidityRiskResult;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// Maximum tolerated |delta CR - delta TACR| in one period.
    pub cr_tacr_drift_threshold: Multiple,
    /// Maximum tolerated DSO increase in one period, in days.
    pub dso_escalation_threshold: Days,
    /// Minimum acceptable CFO / PAT.
    pub cfo_pat_floor: Multiple,
    /// Optional absolute DSO ceiling in days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dso_ceiling: Option<Days>,
    /// Flag periods where CR >= 1 while TACR < 1.
    pub cr_tacr_inversion: bool,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            cr_tacr_drift_threshold: dec!(0.5),
            dso_escalation_threshold: dec!(15),
            cfo_pat_floor: dec!(0.7),
            dso_ceiling: None,
            cr_tacr_inversion: false,
        }
    }
}

impl SignalThresholds {
    pub fn validate(&self) -> LiquidityRiskResult<()> {
        if self.cr_tacr_drift_threshold <= Decimal::ZERO {
            return Err(LiquidityRiskError::config(
                "signals.cr_tacr_drift_threshold",
                format!("must be positive, got {}", self.cr_tacr_drift_threshold),
            ));
        }
        if self.dso_escalation_threshold <= Decimal::ZERO {
            return Err(LiquidityRiskError::config(
                "signals.dso_escalation_threshold",
                format!("must be positive, got {}", self.dso_escalation_threshold),
            ));
        }
        if self.cfo_pat_floor < Decimal::ZERO {
            return Err(LiquidityRiskError::config(
                "signals.cfo_pat_floor",
                format!("must not be negative, got {}", self.cfo_pat_floor),
            ));
        }
        if let Some(ceiling) = self.dso_ceiling {
            if ceiling <= Decimal::ZERO {
                return Err(LiquidityRiskError::config(
                    "signals.dso_ceiling",
                    format!("must be positive, got {ceiling}"),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalId {
    CrTacrDrift,
    DsoEscalation,
    CfoPatDivergence,
    DsoCeiling,
    CrTacrInversion,
}

impl SignalId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalId::CrTacrDrift => "cr_tacr_drift",
            SignalId::DsoEscalation => "dso_escalation",
            SignalId::CfoPatDivergence => "cfo_pat_divergence",
            SignalId::DsoCeiling => "dso_ceiling",
            SignalId::CrTacrInversion => "cr_tacr_inversion",
        }
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Triggered,
    Clear,
    NotEvaluable,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Triggered => "triggered",
            SignalStatus::Clear => "clear",
            SignalStatus::NotEvaluable => "not_evaluable",
        }
    }
}

/// Outcome of one rule for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFlag {
    pub id: SignalId,
    pub status: SignalStatus,
    /// Observed deviation; absent when the rule was not evaluable.
    pub magnitude: Option<Decimal>,
    pub threshold: Decimal,
}

impl SignalFlag {
    pub fn is_triggered(&self) -> bool {
        self.status == SignalStatus::Triggered
    }
}

/// All rule outcomes for one period, in rule-table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFlags {
    pub period: PeriodId,
    pub flags: Vec<SignalFlag>,
}

impl SignalFlags {
    pub fn get(&self, id: SignalId) -> Option<&SignalFlag> {
        self.flags.iter().find(|f| f.id == id)
    }

    pub fn triggered_count(&self) -> usize {
        self.flags.iter().filter(|f| f.is_triggered()).count()
    }

    pub fn evaluable_count(&self) -> usize {
        self.flags
            .iter()
            .filter(|f| f.status != SignalStatus::NotEvaluable)
            .count()
    }

    /// Share of active rules that triggered, in [0, 1]. Rules that could not
    /// be evaluated count as active but not triggered.
    pub fn severity(&self) -> Decimal {
        if self.flags.is_empty() {
            return Decimal::ZERO;
        }
        Decimal::from(self.triggered_count()) / Decimal::from(self.flags.len())
    }
}
