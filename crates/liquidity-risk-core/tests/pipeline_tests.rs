use liquidity_risk_core::period::{load_entities, RawTable};
use liquidity_risk_core::pipeline::{score_periods, score_table};
use liquidity_risk_core::ratios::TacrDefinition;
use liquidity_risk_core::scoring::RiskBucket;
use liquidity_risk_core::summary::summarize_table;
use liquidity_risk_core::{EngineConfig, LiquidityRiskError, ValidatedConfig};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::json;

// ===========================================================================
// Fixtures
// ===========================================================================

fn degraded_ok() -> ValidatedConfig {
    let mut config = EngineConfig::default();
    config.aggregation.allow_missing_anomaly = true;
    config.validate().unwrap()
}

fn quarterly_json() -> serde_json::Value {
    json!([
        {"entity": "North", "period": "2023-Q1", "current_assets": 900, "current_liabilities": 600,
         "total_assets": 4000, "cfo": 40, "pat": 35, "receivables": 180, "revenue": 900,
         "cash": 120, "trade_payables": 200, "short_term_borrowings": 100},
        {"entity": "North", "period": "2023-Q2", "current_assets": 880, "current_liabilities": 600,
         "total_assets": 4000, "cfo": 42, "pat": 36, "receivables": 185, "revenue": 910,
         "cash": 115, "trade_payables": 200, "short_term_borrowings": 100},
        {"entity": "South", "period": "2023-Q1", "current_assets": 500, "current_liabilities": 0,
         "total_assets": 2000, "cfo": 10, "pat": 0, "receivables": 90, "revenue": 0,
         "cash": 20, "trade_payables": 0, "short_term_borrowings": 0},
        {"entity": "North", "period": "2023-Q3", "current_assets": 870, "current_liabilities": 610,
         "total_assets": 4050, "cfo": 41, "pat": 37, "receivables": 190, "revenue": 905,
         "cash": 110, "trade_payables": 205, "short_term_borrowings": 100}
    ])
}

// ===========================================================================
// Tables
// ===========================================================================

#[test]
fn test_multi_entity_split_keeps_first_seen_order() {
    let table = RawTable::from_json(&quarterly_json()).unwrap();
    let out = score_table(&table, &degraded_ok()).unwrap();
    let names: Vec<Option<&str>> = out
        .result
        .entities
        .iter()
        .map(|e| e.entity.as_deref())
        .collect();
    assert_eq!(names, vec![Some("North"), Some("South")]);
    assert_eq!(out.result.entities[0].periods.len(), 3);
    assert_eq!(out.result.periods_scored(), 4);
}

#[test]
fn test_quarter_lengths_drive_dso() {
    let table = RawTable::from_json(&quarterly_json()).unwrap();
    let groups = load_entities(&table, TacrDefinition::QuickLiquidity).unwrap();
    // Q1 2023 has 90 days
    assert_eq!(groups[0].periods[0].period_days, dec!(90));
    let out = score_table(&table, &degraded_ok()).unwrap();
    // 180 * 90 / 900
    assert_eq!(
        out.result.entities[0].periods[0].ratios.dso.value(),
        Some(dec!(18))
    );
}

#[test]
fn test_undefined_ratios_do_not_abort_the_table() {
    let table = RawTable::from_json(&quarterly_json()).unwrap();
    let out = score_table(&table, &degraded_ok()).unwrap();
    let south = &out.result.entities[1];
    let p = &south.periods[0];
    assert!(south.degraded);
    assert!(!p.ratios.current_ratio.is_defined());
    assert!(!p.ratios.dso.is_defined());
    assert!(!p.ratios.cfo_to_pat.is_defined());
    assert_eq!(p.risk.bucket, RiskBucket::Low);
    assert!(out.warnings.iter().any(|w| w.starts_with("South")));
}

#[test]
fn test_missing_column_is_structural() {
    let mut rows = quarterly_json();
    for row in rows.as_array_mut().unwrap() {
        row.as_object_mut().unwrap().remove("receivables");
    }
    let table = RawTable::from_json(&rows).unwrap();
    let err = score_table(&table, &degraded_ok()).unwrap_err();
    assert!(err.is_structural());
    match err {
        LiquidityRiskError::Schema { column, .. } => assert_eq!(column, "receivables"),
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn test_out_of_order_periods_fail_the_run() {
    let mut rows = quarterly_json();
    rows.as_array_mut().unwrap().swap(0, 1);
    let table = RawTable::from_json(&rows).unwrap();
    let err = score_table(&table, &degraded_ok()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Ordering error for entity 'North': period '2023-Q1' does not follow '2023-Q2'"
    );
}

#[test]
fn test_assumptions_record_the_configuration() {
    let table = RawTable::from_json(&quarterly_json()).unwrap();
    let config = degraded_ok();
    let out = score_table(&table, &config).unwrap();
    let recorded: EngineConfig = serde_json::from_value(out.assumptions).unwrap();
    assert_eq!(&recorded, config.config());
}

// ===========================================================================
// Single entity
// ===========================================================================

#[test]
fn test_score_periods_for_one_entity() {
    let table = RawTable::from_json(&quarterly_json()).unwrap();
    let groups = load_entities(&table, TacrDefinition::QuickLiquidity).unwrap();
    let out = score_periods(Some("North"), &groups[0].periods, &degraded_ok()).unwrap();
    assert_eq!(out.result.entity.as_deref(), Some("North"));
    assert_eq!(out.result.periods.len(), 3);
    for p in &out.result.periods {
        assert!(p.risk.composite >= dec!(0) && p.risk.composite <= dec!(100));
    }
}

#[test]
fn test_first_period_deltas_are_never_zero() {
    let table = RawTable::from_json(&quarterly_json()).unwrap();
    let out = score_table(&table, &degraded_ok()).unwrap();
    let first = &out.result.entities[0].periods[0].ratios;
    for delta in [
        first.current_ratio_delta,
        first.tacr_delta,
        first.dso_delta,
        first.cfo_to_pat_delta,
    ] {
        assert_eq!(delta.undefined_reason(), Some("no_prior_period"));
    }
}

// ===========================================================================
// Summary
// ===========================================================================

#[test]
fn test_summary_over_table() {
    let table = RawTable::from_json(&quarterly_json()).unwrap();
    let out = summarize_table(&table, &degraded_ok()).unwrap();
    let s = &out.result;
    assert_eq!(s.entities_analyzed, 2);
    assert_eq!(s.periods_scored, 4);
    assert_eq!(s.mean_score_by_period.len(), 3);
    assert_eq!(s.mean_score_by_period[0].entities, 2);
    assert_eq!(
        s.bucket_counts.low + s.bucket_counts.medium + s.bucket_counts.high + s.bucket_counts.critical,
        4
    );
    assert!(!out.warnings.is_empty());
}
