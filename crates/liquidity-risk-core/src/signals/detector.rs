use tracing::debug;

use super::rules::{Observation, SignalRule};
use super::{SignalFlag, SignalFlags, SignalStatus};
use crate::ratios::RatioRecord;

fn evaluate(rule: &SignalRule, record: &RatioRecord) -> SignalFlag {
    let (status, magnitude) = match (rule.observe)(record, rule.threshold) {
        Observation::Measured { value, magnitude } => {
            let status = if rule.comparator.holds(value, rule.threshold) {
                SignalStatus::Triggered
            } else {
                SignalStatus::Clear
            };
            (status, Some(magnitude))
        }
        Observation::Decided {
            triggered,
            magnitude,
        } => {
            let status = if triggered {
                SignalStatus::Triggered
            } else {
                SignalStatus::Clear
            };
            (status, Some(magnitude))
        }
        Observation::NotEvaluable => (SignalStatus::NotEvaluable, None),
    };

    SignalFlag {
        id: rule.id,
        status,
        magnitude,
        threshold: rule.threshold,
    }
}

/// Evaluate every rule against every record. Output has one entry per
/// record, in input order, and one flag per rule, in table order.
pub fn detect_signals(records: &[RatioRecord], rules: &[SignalRule]) -> Vec<SignalFlags> {
    records
        .iter()
        .map(|record| {
            let flags: Vec<SignalFlag> = rules.iter().map(|rule| evaluate(rule, record)).collect();
            let out = SignalFlags {
                period: record.period.clone(),
                flags,
            };
            if out.triggered_count() > 0 {
                debug!(
                    period = %out.period,
                    triggered = out.triggered_count(),
                    active = out.flags.len(),
                    "signals triggered"
                );
            }
            out
        })
        .collect()
}
