use rust_decimal::Decimal;
use tracing::debug;

use super::{divide, RatioRecord, RatioValue, TacrDefinition};
use crate::error::LiquidityRiskError;
use crate::period::FinancialPeriod;
use crate::LiquidityRiskResult;

fn current_ratio(p: &FinancialPeriod) -> RatioValue {
    RatioValue::from_division(divide(
        p.current_assets,
        p.current_liabilities,
        "current ratio",
    ))
}

fn tacr(p: &FinancialPeriod, definition: TacrDefinition) -> RatioValue {
    match definition {
        TacrDefinition::QuickLiquidity => {
            match (p.cash, p.trade_payables, p.short_term_borrowings) {
                (Some(cash), Some(payables), Some(borrowings)) => RatioValue::from_division(
                    divide(cash + p.receivables, payables + borrowings, "tacr"),
                ),
                _ => RatioValue::UndefinedOperand,
            }
        }
        TacrDefinition::TotalAssetsCoverage => {
            RatioValue::from_division(divide(p.total_assets, p.current_liabilities, "tacr"))
        }
    }
}

/// receivables x days / revenue; multiplying first keeps whole-day results exact.
fn dso(p: &FinancialPeriod) -> RatioValue {
    RatioValue::from_division(divide(p.receivables * p.period_days, p.revenue, "dso"))
}

fn cfo_to_pat(p: &FinancialPeriod) -> RatioValue {
    if p.pat <= Decimal::ZERO {
        return RatioValue::Indeterminate;
    }
    RatioValue::from_division(divide(p.cfo, p.pat, "cfo/pat"))
}

/// Relative change against the magnitude of the prior value, so the sign
/// always follows the direction of movement.
fn trend(current: Decimal, prior: Option<Decimal>) -> RatioValue {
    match prior {
        None => RatioValue::NoPriorPeriod,
        Some(prior) if prior.is_zero() => RatioValue::ZeroDenominator,
        Some(prior) => {
            RatioValue::from_division(divide(current - prior, prior.abs(), "trend"))
        }
    }
}

/// Compute one `RatioRecord` per period.
///
/// Periods must already be in chronological order with strictly increasing
/// identifiers; the sequence is validated but never re-sorted.
pub fn compute_ratios(
    periods: &[FinancialPeriod],
    definition: TacrDefinition,
) -> LiquidityRiskResult<Vec<RatioRecord>> {
    for pair in periods.windows(2) {
        if !pair[1].period.follows(&pair[0].period) {
            return Err(LiquidityRiskError::Ordering {
                entity: None,
                previous: pair[0].period.to_string(),
                period: pair[1].period.to_string(),
            });
        }
    }

    let mut records: Vec<RatioRecord> = Vec::with_capacity(periods.len());
    for (i, p) in periods.iter().enumerate() {
        let prior_period = i.checked_sub(1).map(|j| &periods[j]);
        let prior_record = records.last();

        let current_ratio = current_ratio(p);
        let tacr = tacr(p, definition);
        let dso = dso(p);
        let cfo_to_pat = cfo_to_pat(p);

        let record = RatioRecord {
            period: p.period.clone(),
            current_ratio,
            tacr,
            dso,
            cfo_to_pat,
            current_ratio_delta: RatioValue::delta(
                current_ratio,
                prior_record.map(|r| r.current_ratio),
            ),
            tacr_delta: RatioValue::delta(tacr, prior_record.map(|r| r.tacr)),
            dso_delta: RatioValue::delta(dso, prior_record.map(|r| r.dso)),
            cfo_to_pat_delta: RatioValue::delta(cfo_to_pat, prior_record.map(|r| r.cfo_to_pat)),
            cfo_trend: trend(p.cfo, prior_period.map(|q| q.cfo)),
            pat_trend: trend(p.pat, prior_period.map(|q| q.pat)),
        };

        if !record.current_ratio.is_defined() || !record.dso.is_defined() {
            debug!(
                period = %record.period,
                current_ratio = ?record.current_ratio.undefined_reason(),
                dso = ?record.dso.undefined_reason(),
                "undefined ratio recorded"
            );
        }
        records.push(record);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn period(label: &str, ca: Decimal, cl: Decimal, cfo: Decimal, pat: Decimal) -> FinancialPeriod {
        FinancialPeriod {
            period: label.parse().unwrap(),
            current_assets: ca,
            current_liabilities: cl,
            total_assets: dec!(5000),
            cfo,
            pat,
            receivables: dec!(300),
            revenue: dec!(3650),
            period_days: dec!(365),
            cash: Some(dec!(500)),
            trade_payables: Some(dec!(300)),
            short_term_borrowings: Some(dec!(200)),
        }
    }

    fn two_periods() -> Vec<FinancialPeriod> {
        vec![
            period("2021", dec!(2000), dec!(1000), dec!(110), dec!(100)),
            period("2022", dec!(1900), dec!(1000), dec!(105), dec!(120)),
        ]
    }

    #[test]
    fn test_current_ratio_exact() {
        let r = compute_ratios(&two_periods(), TacrDefinition::QuickLiquidity).unwrap();
        assert_eq!(r[0].current_ratio, RatioValue::Defined(dec!(2)));
        assert_eq!(r[1].current_ratio, RatioValue::Defined(dec!(1.9)));
    }

    #[test]
    fn test_zero_current_liabilities_is_local() {
        let mut periods = two_periods();
        periods[1].current_liabilities = Decimal::ZERO;
        let r = compute_ratios(&periods, TacrDefinition::TotalAssetsCoverage).unwrap();
        assert_eq!(r[1].current_ratio, RatioValue::ZeroDenominator);
        assert_eq!(r[1].tacr, RatioValue::ZeroDenominator);
        assert_eq!(r[1].current_ratio_delta, RatioValue::UndefinedOperand);
    }

    #[test]
    fn test_tacr_definitions() {
        let periods = two_periods();
        let quick = compute_ratios(&periods, TacrDefinition::QuickLiquidity).unwrap();
        // (500 + 300) / (300 + 200)
        assert_eq!(quick[0].tacr, RatioValue::Defined(dec!(1.6)));
        let coverage = compute_ratios(&periods, TacrDefinition::TotalAssetsCoverage).unwrap();
        assert_eq!(coverage[0].tacr, RatioValue::Defined(dec!(5)));
    }

    #[test]
    fn test_quick_liquidity_without_inputs() {
        let mut periods = two_periods();
        periods[0].cash = None;
        let r = compute_ratios(&periods, TacrDefinition::QuickLiquidity).unwrap();
        assert_eq!(r[0].tacr, RatioValue::UndefinedOperand);
    }

    #[test]
    fn test_dso() {
        let r = compute_ratios(&two_periods(), TacrDefinition::QuickLiquidity).unwrap();
        assert_eq!(r[0].dso, RatioValue::Defined(dec!(30)));
    }

    #[test]
    fn test_dso_zero_revenue() {
        let mut periods = two_periods();
        periods[0].revenue = Decimal::ZERO;
        let r = compute_ratios(&periods, TacrDefinition::QuickLiquidity).unwrap();
        assert_eq!(r[0].dso, RatioValue::ZeroDenominator);
        assert_eq!(r[1].dso_delta, RatioValue::UndefinedOperand);
    }

    #[test]
    fn test_cfo_to_pat() {
        let r = compute_ratios(&two_periods(), TacrDefinition::QuickLiquidity).unwrap();
        assert_eq!(r[0].cfo_to_pat, RatioValue::Defined(dec!(1.1)));
        assert_eq!(r[1].cfo_to_pat, RatioValue::Defined(dec!(0.875)));
    }

    #[test]
    fn test_cfo_to_pat_non_positive_pat() {
        let mut periods = two_periods();
        periods[0].pat = Decimal::ZERO;
        periods[1].pat = dec!(-50);
        let r = compute_ratios(&periods, TacrDefinition::QuickLiquidity).unwrap();
        assert_eq!(r[0].cfo_to_pat, RatioValue::Indeterminate);
        assert_eq!(r[1].cfo_to_pat, RatioValue::Indeterminate);
        assert_eq!(r[1].cfo_to_pat_delta, RatioValue::UndefinedOperand);
    }

    #[test]
    fn test_first_period_deltas_undefined() {
        let r = compute_ratios(&two_periods(), TacrDefinition::QuickLiquidity).unwrap();
        let first = &r[0];
        for v in [
            first.current_ratio_delta,
            first.tacr_delta,
            first.dso_delta,
            first.cfo_to_pat_delta,
            first.cfo_trend,
            first.pat_trend,
        ] {
            assert_eq!(v, RatioValue::NoPriorPeriod);
        }
    }

    #[test]
    fn test_deltas_and_trends() {
        let r = compute_ratios(&two_periods(), TacrDefinition::QuickLiquidity).unwrap();
        assert_eq!(r[1].current_ratio_delta, RatioValue::Defined(dec!(-0.1)));
        assert_eq!(r[1].pat_trend, RatioValue::Defined(dec!(0.2)));
        let cfo_trend = r[1].cfo_trend.value().unwrap();
        assert!(cfo_trend < Decimal::ZERO);
    }

    #[test]
    fn test_trend_sign_follows_direction_from_negative_base() {
        let mut periods = two_periods();
        periods[0].pat = dec!(-100);
        periods[1].pat = dec!(-50);
        let r = compute_ratios(&periods, TacrDefinition::QuickLiquidity).unwrap();
        assert_eq!(r[1].pat_trend, RatioValue::Defined(dec!(0.5)));
    }

    #[test]
    fn test_ordering_error() {
        let mut periods = two_periods();
        periods.swap(0, 1);
        match compute_ratios(&periods, TacrDefinition::QuickLiquidity) {
            Err(LiquidityRiskError::Ordering {
                previous, period, ..
            }) => {
                assert_eq!(previous, "2022");
                assert_eq!(period, "2021");
            }
            other => panic!("expected ordering error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_period_is_ordering_error() {
        let mut periods = two_periods();
        periods[1].period = "FY2021".parse().unwrap();
        assert!(matches!(
            compute_ratios(&periods, TacrDefinition::QuickLiquidity),
            Err(LiquidityRiskError::Ordering { .. })
        ));
    }

    #[test]
    fn test_empty_sequence() {
        assert!(compute_ratios(&[], TacrDefinition::QuickLiquidity)
            .unwrap()
            .is_empty());
    }
}
