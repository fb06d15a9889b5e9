use serde::{Deserialize, Serialize};

use crate::anomaly::AnomalyConfig;
use crate::ratios::TacrDefinition;
use crate::scoring::AggregationConfig;
use crate::signals::{rule_table, SignalRule, SignalThresholds};
use crate::LiquidityRiskResult;

/// Every tunable of a scoring run. Missing sections fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tacr: TacrDefinition,
    pub signals: SignalThresholds,
    pub anomaly: AnomalyConfig,
    pub aggregation: AggregationConfig,
}

impl EngineConfig {
    /// Check every section. Nothing is scored with a config that has not
    /// passed through here.
    pub fn validate(self) -> LiquidityRiskResult<ValidatedConfig> {
        self.signals.validate()?;
        self.anomaly.validate()?;
        self.aggregation.validate()?;

        #[cfg(not(feature = "anomaly"))]
        if !self.aggregation.allow_missing_anomaly {
            return Err(crate::error::LiquidityRiskError::config(
                "aggregation.allow_missing_anomaly",
                "must be set when built without the `anomaly` feature",
            ));
        }

        Ok(ValidatedConfig { inner: self })
    }
}

/// An [`EngineConfig`] that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedConfig {
    inner: EngineConfig,
}

impl ValidatedConfig {
    pub fn config(&self) -> &EngineConfig {
        &self.inner
    }

    pub fn into_inner(self) -> EngineConfig {
        self.inner
    }

    pub fn rules(&self) -> Vec<SignalRule> {
        rule_table(&self.inner.signals)
    }
}

impl std::ops::Deref for ValidatedConfig {
    type Target = EngineConfig;

    fn deref(&self) -> &EngineConfig {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LiquidityRiskError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        #[cfg(feature = "anomaly")]
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"signals": {"dso_escalation_threshold": "20"}, "anomaly": {"seed": 7}}"#,
        )
        .unwrap();
        assert_eq!(config.signals.dso_escalation_threshold, dec!(20));
        assert_eq!(config.signals.cfo_pat_floor, dec!(0.7));
        assert_eq!(config.anomaly.seed, 7);
        assert_eq!(config.anomaly.n_trees, 100);
        assert_eq!(config.tacr, TacrDefinition::QuickLiquidity);
    }

    #[test]
    fn test_bad_weights_rejected() {
        let mut config = EngineConfig::default();
        config.aggregation.anomaly_weight = dec!(0.7);
        assert!(matches!(
            config.validate(),
            Err(LiquidityRiskError::Config { .. })
        ));
    }

    #[test]
    fn test_validated_round_trip() {
        let mut config = EngineConfig::default();
        config.aggregation.allow_missing_anomaly = true;
        let validated = config.clone().validate().unwrap();
        let json = serde_json::to_value(&validated).unwrap();
        let back: EngineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
        assert_eq!(validated.rules().len(), 3);
    }
}
