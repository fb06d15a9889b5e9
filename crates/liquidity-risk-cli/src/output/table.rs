use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, result_rows};

/// Columns shown for scored periods; the full row is available via `--output csv`.
const SCORE_COLUMNS: [&str; 8] = [
    "entity",
    "period",
    "triggered",
    "anomaly_score",
    "is_outlier",
    "composite",
    "bucket",
    "degraded",
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    print!("{}", render(value));
}

pub fn render(value: &Value) -> String {
    let mut out = String::new();

    if let Some(rows) = result_rows(value) {
        out.push_str(&rows_table(rows, &SCORE_COLUMNS));
        out.push('\n');
    } else {
        match value.get("result").unwrap_or(value) {
            Value::Object(map) => out.push_str(&object_tables(map)),
            Value::Array(arr) => out.push_str(&array_table(arr)),
            other => {
                out.push_str(&cell(other));
                out.push('\n');
            }
        }
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for w in warnings.iter().filter_map(Value::as_str) {
                out.push_str(&format!("  - {}\n", w));
            }
        }
    }
    if let Some(Value::String(meth)) = value.get("methodology") {
        out.push_str(&format!("\nMethodology: {}\n", meth));
    }
    out
}

/// Scalars go into one Field/Value table; each nested list of records gets
/// its own titled table below it.
fn object_tables(map: &Map<String, Value>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested = Vec::new();

    for (key, val) in map {
        match val {
            Value::Array(arr) if arr.iter().all(Value::is_object) && !arr.is_empty() => {
                nested.push((key, arr));
            }
            Value::Object(inner) => {
                for (k, v) in inner {
                    builder.push_record([format!("{}.{}", key, k), cell(v)]);
                }
            }
            other => builder.push_record([key.clone(), cell(other)]),
        }
    }

    let mut out = format!("{}\n", Table::from(builder));
    for (key, arr) in nested {
        out.push_str(&format!("\n{}:\n{}", key, array_table(arr)));
    }
    out
}

fn array_table(arr: &[Value]) -> String {
    match arr.first() {
        None => "(empty)\n".to_string(),
        Some(Value::Object(first)) => {
            let headers: Vec<&str> = first.keys().map(String::as_str).collect();
            format!("{}\n", rows_table(arr, &headers))
        }
        Some(_) => arr.iter().map(|v| format!("{}\n", cell(v))).collect(),
    }
}

fn rows_table(rows: &[Value], columns: &[&str]) -> String {
    if rows.is_empty() {
        return "(empty)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(columns.iter().copied());
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|c| row.get(*c).map(cell).unwrap_or_default())
            .collect();
        builder.push_record(record);
    }
    Table::from(builder).to_string()
}
