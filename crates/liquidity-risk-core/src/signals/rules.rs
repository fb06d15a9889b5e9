//! The rule table.
//!
//! A rule is data: an id, a threshold from configuration, a comparator and an
//! observer that reads the ratio record. Adding a rule means adding a row to
//! [`rule_table`]; the detector and the aggregator stay untouched.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{SignalId, SignalThresholds};
use crate::ratios::RatioRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// Triggers when the observed value is strictly above the threshold.
    Above,
    /// Triggers when the observed value is strictly below the threshold.
    Below,
}

impl Comparator {
    pub fn holds(&self, value: Decimal, threshold: Decimal) -> bool {
        match self {
            Comparator::Above => value > threshold,
            Comparator::Below => value < threshold,
        }
    }
}

/// What an observer saw in one ratio record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// A value to compare against the threshold with the rule's comparator.
    Measured { value: Decimal, magnitude: Decimal },
    /// The observer already decided (compound rules).
    Decided { triggered: bool, magnitude: Decimal },
    NotEvaluable,
}

pub type Observer = fn(&RatioRecord, Decimal) -> Observation;

#[derive(Debug, Clone)]
pub struct SignalRule {
    pub id: SignalId,
    pub threshold: Decimal,
    pub comparator: Comparator,
    pub observe: Observer,
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

fn observe_cr_tacr_drift(r: &RatioRecord, _threshold: Decimal) -> Observation {
    match (r.current_ratio_delta.value(), r.tacr_delta.value()) {
        (Some(cr), Some(tacr)) => {
            let drift = (cr - tacr).abs();
            Observation::Measured {
                value: drift,
                magnitude: drift,
            }
        }
        _ => Observation::NotEvaluable,
    }
}

fn observe_dso_escalation(r: &RatioRecord, _threshold: Decimal) -> Observation {
    match r.dso_delta.value() {
        Some(delta) => Observation::Measured {
            value: delta,
            magnitude: delta,
        },
        None => Observation::NotEvaluable,
    }
}

/// Triggers on a ratio below the floor or on CFO and PAT moving in strictly
/// opposite directions. The trend branch still works when the ratio itself is
/// indeterminate because PAT turned negative.
fn observe_cfo_pat_divergence(r: &RatioRecord, floor: Decimal) -> Observation {
    let ratio = r.cfo_to_pat.value();
    let trends = match (r.cfo_trend.value(), r.pat_trend.value()) {
        (Some(cfo), Some(pat)) => Some((cfo, pat)),
        _ => None,
    };
    if ratio.is_none() && trends.is_none() {
        return Observation::NotEvaluable;
    }

    let opposite = trends
        .map(|(cfo, pat)| {
            (cfo > Decimal::ZERO && pat < Decimal::ZERO)
                || (cfo < Decimal::ZERO && pat > Decimal::ZERO)
        })
        .unwrap_or(false);
    let below_floor = ratio.map(|x| x < floor).unwrap_or(false);
    let magnitude = match (trends, ratio) {
        (Some((cfo, pat)), _) => (cfo - pat).abs(),
        (None, Some(x)) => (floor - x).max(Decimal::ZERO),
        (None, None) => Decimal::ZERO,
    };

    Observation::Decided {
        triggered: opposite || below_floor,
        magnitude,
    }
}

fn observe_dso_ceiling(r: &RatioRecord, ceiling: Decimal) -> Observation {
    match r.dso.value() {
        Some(dso) => Observation::Measured {
            value: dso,
            magnitude: dso - ceiling,
        },
        None => Observation::NotEvaluable,
    }
}

/// Headline liquidity at or above parity while the quick structure is below.
fn observe_cr_tacr_inversion(r: &RatioRecord, parity: Decimal) -> Observation {
    match (r.current_ratio.value(), r.tacr.value()) {
        (Some(cr), Some(tacr)) => Observation::Decided {
            triggered: cr >= parity && tacr < parity,
            magnitude: cr - tacr,
        },
        _ => Observation::NotEvaluable,
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Build the active rule table from configuration. The three core rules are
/// always present; optional rules are appended when configured.
pub fn rule_table(thresholds: &SignalThresholds) -> Vec<SignalRule> {
    let mut rules = vec![
        SignalRule {
            id: SignalId::CrTacrDrift,
            threshold: thresholds.cr_tacr_drift_threshold,
            comparator: Comparator::Above,
            observe: observe_cr_tacr_drift,
        },
        SignalRule {
            id: SignalId::DsoEscalation,
            threshold: thresholds.dso_escalation_threshold,
            comparator: Comparator::Above,
            observe: observe_dso_escalation,
        },
        SignalRule {
            id: SignalId::CfoPatDivergence,
            threshold: thresholds.cfo_pat_floor,
            comparator: Comparator::Below,
            observe: observe_cfo_pat_divergence,
        },
    ];

    if let Some(ceiling) = thresholds.dso_ceiling {
        rules.push(SignalRule {
            id: SignalId::DsoCeiling,
            threshold: ceiling,
            comparator: Comparator::Above,
            observe: observe_dso_ceiling,
        });
    }
    if thresholds.cr_tacr_inversion {
        rules.push(SignalRule {
            id: SignalId::CrTacrInversion,
            threshold: Decimal::ONE,
            comparator: Comparator::Below,
            observe: observe_cr_tacr_inversion,
        });
    }
    rules
}
