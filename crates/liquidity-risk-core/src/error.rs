use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiquidityRiskError {
    #[error("Schema error: column '{column}': {reason}")]
    Schema { column: String, reason: String },

    #[error("Ordering error{}: period '{period}' does not follow '{previous}'", entity_suffix(.entity))]
    Ordering {
        entity: Option<String>,
        previous: String,
        period: String,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Insufficient data: anomaly scoring needs at least {required} periods, got {supplied}")]
    InsufficientData { required: usize, supplied: usize },

    #[error("Invalid configuration: {field}: {reason}")]
    Config { field: String, reason: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

fn entity_suffix(entity: &Option<String>) -> String {
    match entity {
        Some(e) => format!(" for entity '{e}'"),
        None => String::new(),
    }
}

impl LiquidityRiskError {
    pub(crate) fn schema(column: impl Into<String>, reason: impl Into<String>) -> Self {
        LiquidityRiskError::Schema {
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        LiquidityRiskError::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Attach the entity name to an ordering error raised below the pipeline.
    pub fn with_entity(self, name: Option<&str>) -> Self {
        match self {
            LiquidityRiskError::Ordering {
                entity: None,
                previous,
                period,
            } => LiquidityRiskError::Ordering {
                entity: name.map(str::to_string),
                previous,
                period,
            },
            other => other,
        }
    }

    /// Structural errors abort the whole run; everything else is recoverable
    /// at the step that raised it.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            LiquidityRiskError::Schema { .. }
                | LiquidityRiskError::Ordering { .. }
                | LiquidityRiskError::Config { .. }
        )
    }
}

impl From<serde_json::Error> for LiquidityRiskError {
    fn from(e: serde_json::Error) -> Self {
        LiquidityRiskError::SerializationError(e.to_string())
    }
}
