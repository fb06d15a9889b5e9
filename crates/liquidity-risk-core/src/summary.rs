//! Portfolio-level roll-up of scored tables.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::ValidatedConfig;
use crate::period::{Granularity, PeriodId, RawTable};
use crate::pipeline::{score_table, EntityRiskReport, RiskReport, ScoredPeriod};
use crate::scoring::RiskBucket;
use crate::types::{with_metadata, ComputationOutput, Score};
use crate::LiquidityRiskResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl BucketCounts {
    fn add(&mut self, bucket: RiskBucket) {
        match bucket {
            RiskBucket::Low => self.low += 1,
            RiskBucket::Medium => self.medium += 1,
            RiskBucket::High => self.high += 1,
            RiskBucket::Critical => self.critical += 1,
        }
    }
}

/// Mean composite across every entity that reported the period. Periods with
/// the same end date and granularity are pooled under the first label seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMean {
    pub period: PeriodId,
    pub entities: usize,
    pub mean_score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub periods: usize,
    pub latest_period: Option<PeriodId>,
    pub latest_score: Option<Score>,
    pub latest_bucket: Option<RiskBucket>,
    pub peak_score: Option<Score>,
    pub peak_period: Option<PeriodId>,
    pub high_risk_periods: usize,
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub entities_analyzed: usize,
    pub periods_scored: usize,
    /// Periods in the High or Critical bucket.
    pub high_risk_periods: usize,
    pub degraded_entities: usize,
    pub bucket_counts: BucketCounts,
    /// Chronological.
    pub mean_score_by_period: Vec<PeriodMean>,
    pub entities: Vec<EntitySnapshot>,
}

fn snapshot(report: &EntityRiskReport) -> EntitySnapshot {
    let latest = report.periods.last();
    // first period wins ties
    let peak = report
        .periods
        .iter()
        .fold(None, |best: Option<&ScoredPeriod>, p| match best {
            Some(b) if b.risk.composite >= p.risk.composite => Some(b),
            _ => Some(p),
        });

    EntitySnapshot {
        entity: report.entity.clone(),
        periods: report.periods.len(),
        latest_period: latest.map(|p| p.period.clone()),
        latest_score: latest.map(|p| p.risk.composite),
        latest_bucket: latest.map(|p| p.risk.bucket),
        peak_score: peak.map(|p| p.risk.composite),
        peak_period: peak.map(|p| p.period.clone()),
        high_risk_periods: report
            .periods
            .iter()
            .filter(|p| p.risk.bucket.is_high_risk())
            .count(),
        degraded: report.degraded,
    }
}

/// Roll a scored report up to portfolio level.
pub fn summarize(report: &RiskReport) -> PortfolioSummary {
    let mut bucket_counts = BucketCounts::default();
    let mut by_period: BTreeMap<(NaiveDate, Granularity), (PeriodId, Decimal, usize)> =
        BTreeMap::new();

    for entity in &report.entities {
        for p in &entity.periods {
            bucket_counts.add(p.risk.bucket);
            let slot = by_period
                .entry((p.period.end(), p.period.granularity()))
                .or_insert_with(|| (p.period.clone(), Decimal::ZERO, 0));
            slot.1 += p.risk.composite;
            slot.2 += 1;
        }
    }

    let mean_score_by_period = by_period
        .into_values()
        .map(|(period, sum, n)| PeriodMean {
            period,
            entities: n,
            mean_score: (sum / Decimal::from(n)).round_dp(2),
        })
        .collect();

    let entities: Vec<EntitySnapshot> = report.entities.iter().map(snapshot).collect();

    PortfolioSummary {
        entities_analyzed: report.entities.len(),
        periods_scored: report.periods_scored(),
        high_risk_periods: bucket_counts.high + bucket_counts.critical,
        degraded_entities: entities.iter().filter(|e| e.degraded).count(),
        bucket_counts,
        mean_score_by_period,
        entities,
    }
}

/// Score a table and summarise it in one call. Warnings from scoring are
/// carried through.
pub fn summarize_table(
    table: &RawTable,
    config: &ValidatedConfig,
) -> LiquidityRiskResult<ComputationOutput<PortfolioSummary>> {
    let start = Instant::now();
    let scored = score_table(table, config)?;
    let summary = summarize(&scored.result);
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Liquidity Risk Portfolio Summary",
        config,
        scored.warnings,
        elapsed,
        summary,
    ))
}
