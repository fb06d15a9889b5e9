use clap::{Args, ValueEnum};
use serde_json::{json, Value};

use liquidity_risk_core::EngineConfig;

use crate::input;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

/// Arguments for printing the default configuration
#[derive(Args)]
pub struct ConfigArgs {
    /// Serialization of the printed configuration
    #[arg(long, default_value = "yaml")]
    pub format: ConfigFormat,
}

/// Arguments for validating a configuration file
#[derive(Args)]
pub struct ValidateConfigArgs {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(long)]
    pub config: String,
}

pub fn render_default(format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    let config = EngineConfig::default();
    Ok(match format {
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
    })
}

/// Prints straight to stdout so the output can be saved and edited as-is.
pub fn run_config(args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", render_default(args.format)?);
    Ok(())
}

pub fn run_validate_config(args: ValidateConfigArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = input::file::read_config(&args.config)?;
    let validated = config.validate()?;
    Ok(json!({
        "result": {
            "valid": true,
            "rules": validated.rules().iter().map(|r| r.id.to_string()).collect::<Vec<_>>(),
            "config": serde_json::to_value(&validated)?,
        }
    }))
}
