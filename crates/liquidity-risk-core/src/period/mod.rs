//! Reporting periods and the raw-table loader that produces them.

pub mod id;
pub mod schema;

pub use id::{Granularity, PeriodId};
pub use schema::{load_entities, Column, EntityPeriods, RawTable};

use serde::{Deserialize, Serialize};

use crate::types::{Days, Money};

/// One reporting period for one entity. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialPeriod {
    pub period: PeriodId,
    pub current_assets: Money,
    pub current_liabilities: Money,
    pub total_assets: Money,
    /// Cash flow from operations
    pub cfo: Money,
    /// Profit after tax
    pub pat: Money,
    pub receivables: Money,
    pub revenue: Money,
    pub period_days: Days,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_payables: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_term_borrowings: Option<Money>,
}
