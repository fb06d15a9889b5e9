use napi::Result as NapiResult;
use napi_derive::napi;

use liquidity_risk_core::period::RawTable;
use liquidity_risk_core::{EngineConfig, ValidatedConfig};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Defaults apply when no configuration is passed or a section is omitted.
fn parse_config(config_json: Option<String>) -> NapiResult<ValidatedConfig> {
    let config: EngineConfig = match config_json {
        Some(text) if !text.trim().is_empty() => {
            serde_json::from_str(&text).map_err(to_napi_error)?
        }
        _ => EngineConfig::default(),
    };
    config.validate().map_err(to_napi_error)
}

fn parse_table(table_json: &str) -> NapiResult<RawTable> {
    let value: serde_json::Value = serde_json::from_str(table_json).map_err(to_napi_error)?;
    RawTable::from_json(&value).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[napi]
pub fn score_liquidity_risk(table_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = parse_config(config_json)?;
    let table = parse_table(&table_json)?;
    let output =
        liquidity_risk_core::pipeline::score_table(&table, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn summarize_portfolio(table_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = parse_config(config_json)?;
    let table = parse_table(&table_json)?;
    let output =
        liquidity_risk_core::summary::summarize_table(&table, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[napi]
pub fn validate_config(config_json: String) -> NapiResult<String> {
    let config = parse_config(Some(config_json))?;
    serde_json::to_string(&config).map_err(to_napi_error)
}

#[napi]
pub fn default_config() -> NapiResult<String> {
    serde_json::to_string(&EngineConfig::default()).map_err(to_napi_error)
}
