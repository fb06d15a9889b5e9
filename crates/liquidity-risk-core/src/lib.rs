pub mod anomaly;
pub mod config;
pub mod error;
pub mod period;
pub mod pipeline;
pub mod ratios;
pub mod scoring;
pub mod signals;
pub mod summary;
pub mod types;

pub use config::{EngineConfig, ValidatedConfig};
pub use error::LiquidityRiskError;
pub use types::*;

/// Standard result type for all liquidity-risk operations
pub type LiquidityRiskResult<T> = Result<T, LiquidityRiskError>;
