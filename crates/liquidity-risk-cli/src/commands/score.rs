use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use liquidity_risk_core::anomaly::ScoreNormalization;
use liquidity_risk_core::pipeline::score_table;
use liquidity_risk_core::ratios::TacrDefinition;
use liquidity_risk_core::scoring::WeightPreset;
use liquidity_risk_core::summary::summarize_table;
use liquidity_risk_core::EngineConfig;

use crate::input;
use crate::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TacrArg {
    QuickLiquidity,
    TotalAssetsCoverage,
}

impl From<TacrArg> for TacrDefinition {
    fn from(arg: TacrArg) -> Self {
        match arg {
            TacrArg::QuickLiquidity => TacrDefinition::QuickLiquidity,
            TacrArg::TotalAssetsCoverage => TacrDefinition::TotalAssetsCoverage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NormalizationArg {
    MinMax,
    Rank,
}

impl From<NormalizationArg> for ScoreNormalization {
    fn from(arg: NormalizationArg) -> Self {
        match arg {
            NormalizationArg::MinMax => ScoreNormalization::MinMax,
            NormalizationArg::Rank => ScoreNormalization::Rank,
        }
    }
}

/// Arguments shared by `score` and `summary`
#[derive(Args, Debug, Default)]
pub struct ScoreArgs {
    /// Path to the financial table (.csv or .json); stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Engine configuration file (.yaml, .yml or .json)
    #[arg(long)]
    pub config: Option<String>,

    /// Anomaly model seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Expected share of anomalous periods, 0 to 0.5
    #[arg(long)]
    pub contamination: Option<Decimal>,

    /// Minimum periods per entity before the anomaly model is fitted
    #[arg(long)]
    pub min_periods: Option<usize>,

    /// Anomaly score normalization
    #[arg(long)]
    pub normalization: Option<NormalizationArg>,

    /// Weight preset: ai60_flags40, ai50_flags50 or ai70_flags30
    #[arg(long)]
    pub weights: Option<WeightPreset>,

    /// Liquidity-structure ratio used as the TACR
    #[arg(long)]
    pub tacr: Option<TacrArg>,

    /// Maximum tolerated |delta CR - delta TACR|
    #[arg(long)]
    pub drift_threshold: Option<Decimal>,

    /// Maximum tolerated DSO increase in days
    #[arg(long)]
    pub dso_escalation: Option<Decimal>,

    /// Minimum acceptable CFO / PAT
    #[arg(long)]
    pub cfo_pat_floor: Option<Decimal>,

    /// Flag any period whose DSO exceeds this many days
    #[arg(long)]
    pub dso_ceiling: Option<Decimal>,

    /// Flag periods with CR >= 1 while TACR < 1
    #[arg(long)]
    pub cr_tacr_inversion: bool,

    /// Score from rules alone when an entity has too few periods
    #[arg(long)]
    pub allow_missing_anomaly: bool,
}

/// Configuration file (or defaults) with command-line flags applied on top.
pub fn build_config(args: &ScoreArgs) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match args.config {
        Some(ref path) => input::file::read_config(path)?,
        None => EngineConfig::default(),
    };

    if let Some(tacr) = args.tacr {
        config.tacr = tacr.into();
    }
    if let Some(v) = args.drift_threshold {
        config.signals.cr_tacr_drift_threshold = v;
    }
    if let Some(v) = args.dso_escalation {
        config.signals.dso_escalation_threshold = v;
    }
    if let Some(v) = args.cfo_pat_floor {
        config.signals.cfo_pat_floor = v;
    }
    if args.dso_ceiling.is_some() {
        config.signals.dso_ceiling = args.dso_ceiling;
    }
    if args.cr_tacr_inversion {
        config.signals.cr_tacr_inversion = true;
    }
    if let Some(seed) = args.seed {
        config.anomaly.seed = seed;
    }
    if let Some(c) = args.contamination {
        config.anomaly.contamination = c;
    }
    if let Some(n) = args.min_periods {
        config.anomaly.min_periods = n;
    }
    if let Some(n) = args.normalization {
        config.anomaly.normalization = n.into();
    }
    if let Some(preset) = args.weights {
        config.aggregation.apply_preset(preset);
    }
    if args.allow_missing_anomaly {
        config.aggregation.allow_missing_anomaly = true;
    }
    Ok(config)
}

pub fn run_score(args: ScoreArgs, format: OutputFormat) -> Result<Value, Box<dyn std::error::Error>> {
    let config = build_config(&args)?.validate()?;
    let table = input::read_table(args.input.as_deref())?;
    let output = score_table(&table, &config)?;

    match format {
        OutputFormat::Table | OutputFormat::Csv | OutputFormat::Minimal => Ok(json!({
            "result": { "rows": output.result.rows() },
            "methodology": output.methodology,
            "warnings": output.warnings,
        })),
        OutputFormat::Json => Ok(serde_json::to_value(output)?),
    }
}

pub fn run_summary(args: ScoreArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = build_config(&args)?.validate()?;
    let table = input::read_table(args.input.as_deref())?;
    let output = summarize_table(&table, &config)?;
    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_override_defaults() {
        let args = ScoreArgs {
            seed: Some(7),
            contamination: Some(dec!(0.2)),
            weights: Some(WeightPreset::Ai70Flags30),
            dso_ceiling: Some(dec!(120)),
            tacr: Some(TacrArg::TotalAssetsCoverage),
            allow_missing_anomaly: true,
            ..ScoreArgs::default()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.anomaly.seed, 7);
        assert_eq!(config.anomaly.contamination, dec!(0.2));
        assert_eq!(config.aggregation.rule_weight, dec!(0.3));
        assert_eq!(config.aggregation.anomaly_weight, dec!(0.7));
        assert_eq!(config.signals.dso_ceiling, Some(dec!(120)));
        assert_eq!(config.tacr, TacrDefinition::TotalAssetsCoverage);
        assert!(config.aggregation.allow_missing_anomaly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_flags_keeps_defaults() {
        let config = build_config(&ScoreArgs::default()).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let args = ScoreArgs {
            contamination: Some(dec!(0.9)),
            ..ScoreArgs::default()
        };
        assert!(build_config(&args).unwrap().validate().is_err());
    }
}
