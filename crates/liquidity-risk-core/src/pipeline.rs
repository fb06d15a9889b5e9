//! End-to-end scoring: ratios, signals, anomalies, aggregation.
//!
//! A run either returns a complete scored table or a single error; partial
//! tables are never produced.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info_span, warn};

use crate::anomaly::AnomalyResult;
use crate::config::ValidatedConfig;
use crate::period::{load_entities, FinancialPeriod, PeriodId, RawTable};
use crate::ratios::{compute_ratios, RatioRecord};
use crate::scoring::{aggregate, RiskScore};
use crate::signals::{detect_signals, SignalFlags, SignalRule};
use crate::types::{with_metadata, ComputationOutput, Score};
use crate::LiquidityRiskResult;

const METHODOLOGY: &str =
    "Liquidity Risk Score: ratio drift rules blended with isolation-forest anomaly scores";

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Everything computed for one period of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPeriod {
    pub period: PeriodId,
    pub ratios: RatioRecord,
    pub signals: SignalFlags,
    /// Absent on degraded runs.
    pub anomaly: Option<AnomalyResult>,
    pub risk: RiskScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRiskReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub periods: Vec<ScoredPeriod>,
    /// Scored from rules alone.
    pub degraded: bool,
}

/// Scored output for every entity of a table, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub entities: Vec<EntityRiskReport>,
}

/// One scored period flattened to scalar columns for CSV and table export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub entity: String,
    pub period: String,
    pub current_ratio: Option<Decimal>,
    pub tacr: Option<Decimal>,
    pub dso: Option<Decimal>,
    pub cfo_to_pat: Option<Decimal>,
    pub current_ratio_delta: Option<Decimal>,
    pub tacr_delta: Option<Decimal>,
    pub dso_delta: Option<Decimal>,
    pub cfo_to_pat_delta: Option<Decimal>,
    /// `id=status:magnitude` entries separated by `;`. Rules that could not be
    /// evaluated carry no magnitude.
    pub signals: String,
    pub triggered: usize,
    pub raw_anomaly_score: Option<Decimal>,
    pub anomaly_score: Option<Decimal>,
    pub is_outlier: Option<bool>,
    pub rule_contribution: Score,
    pub anomaly_contribution: Option<Score>,
    pub composite: Score,
    pub bucket: String,
    /// Scored from rules alone.
    pub degraded: bool,
}

impl EntityRiskReport {
    pub fn rows(&self) -> Vec<FlatRow> {
        let entity = self.entity.clone().unwrap_or_default();
        self.periods
            .iter()
            .map(|p| FlatRow {
                entity: entity.clone(),
                period: p.period.to_string(),
                current_ratio: p.ratios.current_ratio.value(),
                tacr: p.ratios.tacr.value(),
                dso: p.ratios.dso.value(),
                cfo_to_pat: p.ratios.cfo_to_pat.value(),
                current_ratio_delta: p.ratios.current_ratio_delta.value(),
                tacr_delta: p.ratios.tacr_delta.value(),
                dso_delta: p.ratios.dso_delta.value(),
                cfo_to_pat_delta: p.ratios.cfo_to_pat_delta.value(),
                signals: p
                    .signals
                    .flags
                    .iter()
                    .map(|f| match f.magnitude {
                        Some(m) => format!("{}={}:{}", f.id, f.status.as_str(), m.normalize()),
                        None => format!("{}={}", f.id, f.status.as_str()),
                    })
                    .collect::<Vec<_>>()
                    .join(";"),
                triggered: p.signals.triggered_count(),
                raw_anomaly_score: p.anomaly.as_ref().map(|a| a.raw_score),
                anomaly_score: p.anomaly.as_ref().map(|a| a.score),
                is_outlier: p.anomaly.as_ref().map(|a| a.is_outlier),
                rule_contribution: p.risk.rule_contribution,
                anomaly_contribution: p.risk.anomaly_contribution,
                composite: p.risk.composite,
                bucket: p.risk.bucket.to_string(),
                degraded: self.degraded,
            })
            .collect()
    }
}

impl RiskReport {
    pub fn rows(&self) -> Vec<FlatRow> {
        self.entities.iter().flat_map(|e| e.rows()).collect()
    }

    pub fn periods_scored(&self) -> usize {
        self.entities.iter().map(|e| e.periods.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Anomaly step
// ---------------------------------------------------------------------------

/// `Ok(None)` means the run continues degraded.
#[cfg(feature = "anomaly")]
fn anomaly_step(
    records: &[RatioRecord],
    config: &ValidatedConfig,
    entity: &str,
    warnings: &mut Vec<String>,
) -> LiquidityRiskResult<Option<Vec<AnomalyResult>>> {
    use crate::anomaly::score_anomalies;
    use crate::error::LiquidityRiskError;

    match score_anomalies(records, &config.anomaly) {
        Ok(results) => Ok(Some(results)),
        Err(LiquidityRiskError::InsufficientData { required, supplied })
            if config.aggregation.allow_missing_anomaly =>
        {
            warn!(entity, required, supplied, "anomaly model skipped, scoring from rules only");
            warnings.push(format!(
                "{entity}: anomaly scoring needs {required} periods, got {supplied}; \
                 scores use rule severity only"
            ));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(not(feature = "anomaly"))]
fn anomaly_step(
    _records: &[RatioRecord],
    _config: &ValidatedConfig,
    entity: &str,
    warnings: &mut Vec<String>,
) -> LiquidityRiskResult<Option<Vec<AnomalyResult>>> {
    warn!(entity, "built without anomaly scoring, scoring from rules only");
    warnings.push(format!(
        "{entity}: anomaly scoring unavailable in this build; scores use rule severity only"
    ));
    Ok(None)
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

fn undefined_ratio_warnings(entity: &str, records: &[RatioRecord], warnings: &mut Vec<String>) {
    for r in records {
        let levels = [
            ("current_ratio", r.current_ratio),
            ("tacr", r.tacr),
            ("dso", r.dso),
            ("cfo_to_pat", r.cfo_to_pat),
        ];
        for (name, value) in levels {
            if let Some(reason) = value.undefined_reason() {
                warn!(entity, period = %r.period, ratio = name, reason, "ratio undefined");
                warnings.push(format!("{entity} {}: {name} undefined ({reason})", r.period));
            }
        }
    }
}

fn score_entity(
    entity: Option<&str>,
    periods: &[FinancialPeriod],
    config: &ValidatedConfig,
    rules: &[SignalRule],
    warnings: &mut Vec<String>,
) -> LiquidityRiskResult<EntityRiskReport> {
    let name = entity.unwrap_or("(single entity)");
    let span = info_span!("entity", entity = name);
    let _guard = span.enter();

    let records = compute_ratios(periods, config.tacr).map_err(|e| e.with_entity(entity))?;
    undefined_ratio_warnings(name, &records, warnings);

    let flags = detect_signals(&records, rules);
    let anomalies = anomaly_step(&records, config, name, warnings)?;
    let scores = aggregate(&flags, anomalies.as_deref(), &config.aggregation)?;

    let degraded = anomalies.is_none();
    let mut anomalies = anomalies.map(|a| a.into_iter());
    let periods: Vec<ScoredPeriod> = records
        .into_iter()
        .zip(flags)
        .zip(scores)
        .map(|((ratios, signals), risk)| ScoredPeriod {
            period: ratios.period.clone(),
            anomaly: anomalies.as_mut().and_then(|it| it.next()),
            ratios,
            signals,
            risk,
        })
        .collect();

    debug!(periods = periods.len(), degraded, "entity scored");

    Ok(EntityRiskReport {
        entity: entity.map(str::to_string),
        periods,
        degraded,
    })
}

/// Score one entity's ordered period sequence.
pub fn score_periods(
    entity: Option<&str>,
    periods: &[FinancialPeriod],
    config: &ValidatedConfig,
) -> LiquidityRiskResult<ComputationOutput<EntityRiskReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let report = score_entity(entity, periods, config, &config.rules(), &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(METHODOLOGY, config, warnings, elapsed, report))
}

/// Validate a raw table, split it by entity and score every entity
/// independently with the same configuration.
pub fn score_table(
    table: &RawTable,
    config: &ValidatedConfig,
) -> LiquidityRiskResult<ComputationOutput<RiskReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let groups = load_entities(table, config.tacr)?;
    let rules = config.rules();

    let entities = groups
        .iter()
        .map(|g| score_entity(g.entity.as_deref(), &g.periods, config, &rules, &mut warnings))
        .collect::<LiquidityRiskResult<Vec<_>>>()?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        METHODOLOGY,
        config,
        warnings,
        elapsed,
        RiskReport { entities },
    ))
}
