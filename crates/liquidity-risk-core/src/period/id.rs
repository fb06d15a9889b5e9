//! Fiscal period identifiers.
//!
//! A `PeriodId` keeps the caller's label verbatim and resolves it to a
//! period-end date plus a granularity. Ordering is by period-end date, so
//! `2021Q4` and `2021` compare equal in time and can never follow each other
//! in a strictly increasing sequence.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::LiquidityRiskError;
use crate::LiquidityRiskResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Year,
    Half,
    Quarter,
    Month,
    /// A bare period-end date; calendar length unknown.
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodId {
    label: String,
    start: Option<NaiveDate>,
    end: NaiveDate,
    granularity: Granularity,
}

impl PeriodId {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Number of calendar days covered by the period, inclusive of both ends.
    pub fn calendar_days(&self) -> Option<u32> {
        self.start
            .map(|start| ((self.end - start).num_days() + 1) as u32)
    }

    /// True when `self` ends strictly after `previous`.
    pub fn follows(&self, previous: &PeriodId) -> bool {
        self.end > previous.end
    }
}

fn invalid(label: &str, reason: &str) -> LiquidityRiskError {
    LiquidityRiskError::InvalidInput {
        field: "period".into(),
        reason: format!("'{label}': {reason}"),
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn parse_year(s: &str) -> Option<i32> {
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Build a period spanning `months` months and ending on the last day of
/// `end_month`.
fn span(
    label: &str,
    year: i32,
    end_month: u32,
    months: u32,
    granularity: Granularity,
) -> LiquidityRiskResult<PeriodId> {
    let start_month = end_month + 1 - months;
    let start = NaiveDate::from_ymd_opt(year, start_month, 1)
        .ok_or_else(|| invalid(label, "date out of range"))?;
    let end =
        last_day_of_month(year, end_month).ok_or_else(|| invalid(label, "date out of range"))?;
    Ok(PeriodId {
        label: label.to_string(),
        start: Some(start),
        end,
        granularity,
    })
}

impl FromStr for PeriodId {
    type Err = LiquidityRiskError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let label = raw.trim();
        if label.is_empty() {
            return Err(invalid(label, "empty period identifier"));
        }
        let upper = label.to_ascii_uppercase();
        let body = upper
            .strip_prefix("FY")
            .map(|rest| rest.trim_start_matches([' ', '-']))
            .unwrap_or(&upper);

        // 2021
        if let Some(year) = parse_year(body) {
            return span(label, year, 12, 12, Granularity::Year);
        }

        // 2021-06-30
        if body.len() == 10 {
            if let Ok(date) = NaiveDate::parse_from_str(body, "%Y-%m-%d") {
                return Ok(PeriodId {
                    label: label.to_string(),
                    start: None,
                    end: date,
                    granularity: Granularity::Day,
                });
            }
        }

        let year = body
            .get(..4)
            .and_then(parse_year)
            .ok_or_else(|| invalid(label, "expected a four-digit year"))?;
        let rest = body[4..].trim_start_matches([' ', '-']);

        // 2021Q3, 2021-Q3, 2021 Q3
        if let Some(q) = rest.strip_prefix('Q') {
            return match q {
                "1" | "2" | "3" | "4" => {
                    let quarter: u32 = q.parse().map_err(|_| invalid(label, "bad quarter"))?;
                    span(label, year, quarter * 3, 3, Granularity::Quarter)
                }
                _ => Err(invalid(label, "quarter must be Q1-Q4")),
            };
        }

        // 2021H1, 2021-H2
        if let Some(h) = rest.strip_prefix('H') {
            return match h {
                "1" => span(label, year, 6, 6, Granularity::Half),
                "2" => span(label, year, 12, 6, Granularity::Half),
                _ => Err(invalid(label, "half must be H1 or H2")),
            };
        }

        // 2021-06
        if rest.len() == 2 && rest.chars().all(|c| c.is_ascii_digit()) {
            let month: u32 = rest.parse().map_err(|_| invalid(label, "bad month"))?;
            if !(1..=12).contains(&month) {
                return Err(invalid(label, "month must be 01-12"));
            }
            return span(label, year, month, 1, Granularity::Month);
        }

        Err(invalid(
            label,
            "unrecognised format (use 2021, FY2021, 2021H1, 2021Q3, 2021-06 or 2021-06-30)",
        ))
    }
}

impl TryFrom<String> for PeriodId {
    type Error = LiquidityRiskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeriodId> for String {
    fn from(value: PeriodId) -> Self {
        value.label
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl PartialOrd for PeriodId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PeriodId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.end
            .cmp(&other.end)
            .then_with(|| self.start.cmp(&other.start))
            .then_with(|| self.label.cmp(&other.label))
    }
}
