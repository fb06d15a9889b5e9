//! Raw table loading and column validation.
//!
//! External loaders (CSV readers, spreadsheet exporters, JSON APIs) hand the
//! engine a header row plus string cells. This module maps headers onto the
//! engine's columns, checks that every required column is present, parses
//! each cell and splits the rows into one chronologically ordered sequence
//! per entity. Any structural problem is a `Schema` error naming the column,
//! the row and the offending value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use super::{FinancialPeriod, PeriodId};
use crate::error::LiquidityRiskError;
use crate::ratios::TacrDefinition;
use crate::LiquidityRiskResult;

// ---------------------------------------------------------------------------
// Raw table
// ---------------------------------------------------------------------------

/// Header row plus string cells, exactly as an external loader read them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Accepts either an array of row objects or an object holding one under
    /// `rows` or `periods`.
    pub fn from_json(value: &Value) -> LiquidityRiskResult<Self> {
        match value {
            Value::Array(rows) => Self::from_json_rows(rows),
            Value::Object(map) => match map.get("rows").or_else(|| map.get("periods")) {
                Some(Value::Array(rows)) => Self::from_json_rows(rows),
                _ => Err(LiquidityRiskError::schema(
                    "rows",
                    "expected an array of row objects or an object with a 'rows' array",
                )),
            },
            _ => Err(LiquidityRiskError::schema(
                "rows",
                "expected an array of row objects",
            )),
        }
    }

    /// Headers are the union of all row keys in first-seen order.
    pub fn from_json_rows(rows: &[Value]) -> LiquidityRiskResult<Self> {
        let mut headers: Vec<String> = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let obj = row.as_object().ok_or_else(|| {
                LiquidityRiskError::schema("rows", format!("row {}: expected an object", i + 1))
            })?;
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
        let cells = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|h| row.get(h).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();
        Ok(Self {
            headers,
            rows: cells,
        })
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Entity,
    Period,
    PeriodDays,
    CurrentAssets,
    CurrentLiabilities,
    TotalAssets,
    Cfo,
    Pat,
    Receivables,
    Revenue,
    Cash,
    TradePayables,
    ShortTermBorrowings,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::Entity,
        Column::Period,
        Column::PeriodDays,
        Column::CurrentAssets,
        Column::CurrentLiabilities,
        Column::TotalAssets,
        Column::Cfo,
        Column::Pat,
        Column::Receivables,
        Column::Revenue,
        Column::Cash,
        Column::TradePayables,
        Column::ShortTermBorrowings,
    ];

    /// Columns every table must carry regardless of configuration.
    pub const REQUIRED: [Column; 8] = [
        Column::Period,
        Column::CurrentAssets,
        Column::CurrentLiabilities,
        Column::TotalAssets,
        Column::Cfo,
        Column::Pat,
        Column::Receivables,
        Column::Revenue,
    ];

    pub fn canonical(&self) -> &'static str {
        match self {
            Column::Entity => "entity",
            Column::Period => "period",
            Column::PeriodDays => "period_days",
            Column::CurrentAssets => "current_assets",
            Column::CurrentLiabilities => "current_liabilities",
            Column::TotalAssets => "total_assets",
            Column::Cfo => "cfo",
            Column::Pat => "pat",
            Column::Receivables => "receivables",
            Column::Revenue => "revenue",
            Column::Cash => "cash",
            Column::TradePayables => "trade_payables",
            Column::ShortTermBorrowings => "short_term_borrowings",
        }
    }

    /// Accepted header spellings after normalization (lowercase, letters and
    /// digits only).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Entity => &["entity", "company", "borrower", "name"],
            Column::Period => &["period", "year", "fiscalyear", "fy", "periodid", "quarter"],
            Column::PeriodDays => &["perioddays", "days", "daysinperiod", "periodlength"],
            Column::CurrentAssets => &["currentassets", "totalcurrentassets", "ca"],
            Column::CurrentLiabilities => {
                &["currentliabilities", "totalcurrentliabilities", "cl"]
            }
            Column::TotalAssets => &["totalassets", "assets"],
            Column::Cfo => &[
                "cfo",
                "cashflowfromoperations",
                "operatingcashflow",
                "ocf",
            ],
            Column::Pat => &["pat", "profitaftertax", "netprofit", "netincome"],
            Column::Receivables => &[
                "receivables",
                "tradereceivables",
                "accountsreceivable",
                "debtors",
            ],
            Column::Revenue => &["revenue", "sales", "netsales", "turnover"],
            Column::Cash => &["cash", "cashandequivalents", "cashandcashequivalents"],
            Column::TradePayables => &[
                "tradepayables",
                "accountspayable",
                "payables",
                "creditors",
            ],
            Column::ShortTermBorrowings => {
                &["shorttermborrowings", "stborrowings", "shorttermdebt"]
            }
        }
    }

    fn matches(&self, header: &str) -> bool {
        self.aliases().contains(&normalize(header).as_str())
    }
}

fn normalize(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn map_columns(headers: &[String]) -> LiquidityRiskResult<HashMap<Column, usize>> {
    let mut index = HashMap::new();
    for (i, header) in headers.iter().enumerate() {
        match Column::ALL.iter().find(|c| c.matches(header)) {
            Some(col) => {
                if let Some(prev) = index.insert(*col, i) {
                    return Err(LiquidityRiskError::schema(
                        col.canonical(),
                        format!(
                            "ambiguous headers '{}' and '{}' both map to this column",
                            headers[prev], header
                        ),
                    ));
                }
            }
            None => debug!(header = %header, "ignoring unrecognised column"),
        }
    }
    Ok(index)
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

/// Parses `1,250.50`, `-30`, `(120)` and `1.2e6`. Empty cells are `None`.
fn parse_amount(raw: &str) -> Result<Option<Decimal>, ()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();
    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| ())?;
    Ok(Some(if negative { -value } else { value }))
}

struct RowReader<'a> {
    row: &'a [String],
    row_no: usize,
    columns: &'a HashMap<Column, usize>,
}

impl<'a> RowReader<'a> {
    fn text(&self, col: Column) -> Option<&'a str> {
        self.columns
            .get(&col)
            .map(|&idx| self.row.get(idx).map(String::as_str).unwrap_or(""))
    }

    fn optional(&self, col: Column) -> LiquidityRiskResult<Option<Decimal>> {
        match self.text(col) {
            None => Ok(None),
            Some(raw) => parse_amount(raw).map_err(|_| {
                LiquidityRiskError::schema(
                    col.canonical(),
                    format!("row {}: '{}' is not a number", self.row_no, raw.trim()),
                )
            }),
        }
    }

    fn required(&self, col: Column) -> LiquidityRiskResult<Decimal> {
        self.optional(col)?.ok_or_else(|| {
            LiquidityRiskError::schema(
                col.canonical(),
                format!("row {}: missing value", self.row_no),
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// The period sequence of one entity, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPeriods {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub periods: Vec<FinancialPeriod>,
}

/// Columns a table must carry for the given TACR definition.
pub fn required_columns(tacr: TacrDefinition) -> Vec<Column> {
    let mut cols = Column::REQUIRED.to_vec();
    cols.extend_from_slice(tacr.required_columns());
    cols
}

/// Validate a raw table and split it into per-entity period sequences.
///
/// Entity groups appear in first-seen order and each keeps its rows in input
/// order; chronological validation is left to the ratio calculator.
pub fn load_entities(
    table: &RawTable,
    tacr: TacrDefinition,
) -> LiquidityRiskResult<Vec<EntityPeriods>> {
    if table.rows.is_empty() {
        return Err(LiquidityRiskError::schema("rows", "table has no period rows"));
    }

    let columns = map_columns(&table.headers)?;
    for col in required_columns(tacr) {
        if !columns.contains_key(&col) {
            return Err(LiquidityRiskError::schema(
                col.canonical(),
                format!(
                    "required column missing (accepted headers: {})",
                    col.aliases().join(", ")
                ),
            ));
        }
    }
    let tacr_columns = tacr.required_columns();

    let mut groups: Vec<EntityPeriods> = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        let reader = RowReader {
            row,
            row_no: i + 1,
            columns: &columns,
        };

        let entity = match reader.text(Column::Entity) {
            Some(name) if name.trim().is_empty() => {
                return Err(LiquidityRiskError::schema(
                    "entity",
                    format!("row {}: empty entity name", reader.row_no),
                ));
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        let period_text = reader.text(Column::Period).unwrap_or("");
        let period: PeriodId = period_text.parse().map_err(|e: LiquidityRiskError| {
            LiquidityRiskError::schema("period", format!("row {}: {e}", reader.row_no))
        })?;

        let period_days = match reader.optional(Column::PeriodDays)? {
            Some(days) => days,
            None => period.calendar_days().map(Decimal::from).ok_or_else(|| {
                LiquidityRiskError::schema(
                    "period_days",
                    format!(
                        "row {}: period '{}' has no calendar length; supply period_days",
                        reader.row_no, period
                    ),
                )
            })?,
        };
        if period_days <= Decimal::ZERO {
            return Err(LiquidityRiskError::schema(
                "period_days",
                format!("row {}: must be positive, got {period_days}", reader.row_no),
            ));
        }

        let tacr_input = |col: Column| -> LiquidityRiskResult<Option<Decimal>> {
            if tacr_columns.contains(&col) {
                reader.required(col).map(Some)
            } else {
                reader.optional(col)
            }
        };

        let record = FinancialPeriod {
            period,
            current_assets: reader.required(Column::CurrentAssets)?,
            current_liabilities: reader.required(Column::CurrentLiabilities)?,
            total_assets: reader.required(Column::TotalAssets)?,
            cfo: reader.required(Column::Cfo)?,
            pat: reader.required(Column::Pat)?,
            receivables: reader.required(Column::Receivables)?,
            revenue: reader.required(Column::Revenue)?,
            period_days,
            cash: tacr_input(Column::Cash)?,
            trade_payables: tacr_input(Column::TradePayables)?,
            short_term_borrowings: tacr_input(Column::ShortTermBorrowings)?,
        };

        match groups.iter_mut().find(|g| g.entity == entity) {
            Some(group) => group.periods.push(record),
            None => groups.push(EntityPeriods {
                entity,
                periods: vec![record],
            }),
        }
    }

    debug!(
        rows = table.rows.len(),
        entities = groups.len(),
        "loaded financial table"
    );
    Ok(groups)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
