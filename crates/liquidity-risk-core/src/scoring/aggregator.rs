use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{AggregationConfig, RiskScore};
use crate::anomaly::AnomalyResult;
use crate::error::LiquidityRiskError;
use crate::signals::SignalFlags;
use crate::LiquidityRiskResult;

const SCALE: Decimal = dec!(100);

/// Combine rule severity and normalized anomaly score into one composite per
/// period.
///
/// `anomalies` is `None` on a degraded run: the composite then comes from
/// rule severity alone and no anomaly contribution is reported. Both inputs
/// must cover the same periods in the same order.
pub fn aggregate(
    flags: &[SignalFlags],
    anomalies: Option<&[AnomalyResult]>,
    config: &AggregationConfig,
) -> LiquidityRiskResult<Vec<RiskScore>> {
    if let Some(anomalies) = anomalies {
        if anomalies.len() != flags.len() {
            return Err(LiquidityRiskError::InvalidInput {
                field: "anomalies".into(),
                reason: format!(
                    "{} anomaly results for {} signal rows",
                    anomalies.len(),
                    flags.len()
                ),
            });
        }
        if let Some((f, a)) = flags.iter().zip(anomalies).find(|(f, a)| f.period != a.period) {
            return Err(LiquidityRiskError::InvalidInput {
                field: "anomalies".into(),
                reason: format!("period mismatch: '{}' vs '{}'", f.period, a.period),
            });
        }
    }

    let scores = flags
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let severity = f.severity();
            let (rule_part, anomaly_part) = match anomalies {
                Some(a) => (
                    SCALE * config.rule_weight * severity,
                    Some(SCALE * config.anomaly_weight * a[i].score),
                ),
                None => (SCALE * severity, None),
            };

            let composite = (rule_part + anomaly_part.unwrap_or(Decimal::ZERO))
                .round_dp(2)
                .clamp(Decimal::ZERO, SCALE);

            RiskScore {
                period: f.period.clone(),
                composite,
                rule_severity: severity,
                rule_contribution: rule_part.round_dp(2),
                anomaly_contribution: anomaly_part.map(|p| p.round_dp(2)),
                bucket: config.buckets.classify(composite),
                degraded: anomalies.is_none(),
            }
        })
        .collect();

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodId;
    use crate::scoring::{RiskBucket, WeightPreset};
    use crate::signals::{SignalFlag, SignalId, SignalStatus};

    fn flags(label: &str, triggered: usize) -> SignalFlags {
        let ids = [
            SignalId::CrTacrDrift,
            SignalId::DsoEscalation,
            SignalId::CfoPatDivergence,
        ];
        SignalFlags {
            period: label.parse().unwrap(),
            flags: ids
                .iter()
                .enumerate()
                .map(|(i, id)| SignalFlag {
                    id: *id,
                    status: if i < triggered {
                        SignalStatus::Triggered
                    } else {
                        SignalStatus::Clear
                    },
                    magnitude: Some(Decimal::ZERO),
                    threshold: Decimal::ONE,
                })
                .collect(),
        }
    }

    fn anomaly(label: &str, score: Decimal) -> AnomalyResult {
        AnomalyResult {
            period: label.parse::<PeriodId>().unwrap(),
            raw_score: score,
            score,
            is_outlier: false,
        }
    }

    #[test]
    fn test_full_signal_is_critical() {
        let out = aggregate(
            &[flags("2024", 3)],
            Some(&[anomaly("2024", Decimal::ONE)]),
            &AggregationConfig::default(),
        )
        .unwrap();
        assert_eq!(out[0].composite, dec!(100));
        assert_eq!(out[0].rule_contribution, dec!(40));
        assert_eq!(out[0].anomaly_contribution, Some(dec!(60)));
        assert_eq!(out[0].bucket, RiskBucket::Critical);
        assert!(!out[0].degraded);
    }

    #[test]
    fn test_weighted_combination() {
        // 0.4 * 1/3 + 0.6 * 0.5 = 0.4333...
        let out = aggregate(
            &[flags("2024", 1)],
            Some(&[anomaly("2024", dec!(0.5))]),
            &AggregationConfig::default(),
        )
        .unwrap();
        assert_eq!(out[0].composite, dec!(43.33));
        assert_eq!(out[0].bucket, RiskBucket::Medium);
    }

    #[test]
    fn test_preset_changes_weighting() {
        let config = AggregationConfig::with_preset(WeightPreset::Ai70Flags30);
        let out = aggregate(
            &[flags("2024", 0)],
            Some(&[anomaly("2024", Decimal::ONE)]),
            &config,
        )
        .unwrap();
        assert_eq!(out[0].composite, dec!(70));
        assert_eq!(out[0].bucket, RiskBucket::High);
    }

    #[test]
    fn test_degraded_uses_rules_only() {
        let out = aggregate(&[flags("2023", 0), flags("2024", 2)], None, &AggregationConfig::default())
            .unwrap();
        assert_eq!(out[0].composite, Decimal::ZERO);
        assert_eq!(out[0].bucket, RiskBucket::Low);
        assert_eq!(out[1].composite, dec!(66.67));
        assert_eq!(out[1].anomaly_contribution, None);
        assert!(out.iter().all(|s| s.degraded));
    }

    #[test]
    fn test_composite_within_bounds() {
        for triggered in 0..=3 {
            for score in [dec!(0), dec!(0.25), dec!(0.999), dec!(1)] {
                let out = aggregate(
                    &[flags("2024", triggered)],
                    Some(&[anomaly("2024", score)]),
                    &AggregationConfig::default(),
                )
                .unwrap();
                assert!(out[0].composite >= Decimal::ZERO && out[0].composite <= dec!(100));
            }
        }
    }

    #[test]
    fn test_misaligned_inputs_rejected() {
        let result = aggregate(
            &[flags("2023", 0)],
            Some(&[anomaly("2024", Decimal::ONE)]),
            &AggregationConfig::default(),
        );
        assert!(matches!(result, Err(LiquidityRiskError::InvalidInput { .. })));
        let result = aggregate(&[flags("2023", 0)], Some(&[]), &AggregationConfig::default());
        assert!(result.is_err());
    }
}
