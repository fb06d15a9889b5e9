use serde_json::Value;

use super::{cell, result_rows};

/// Print just the headline numbers.
///
/// Scored tables print one `entity period composite bucket` line per period;
/// other results print the first well-known key found, falling back to the
/// first field.
pub fn print_minimal(value: &Value) {
    for line in minimal_lines(value) {
        println!("{}", line);
    }
}

pub fn minimal_lines(value: &Value) -> Vec<String> {
    if let Some(rows) = result_rows(value) {
        return rows
            .iter()
            .map(|row| {
                let field = |k: &str| row.get(k).map(cell).unwrap_or_default();
                let entity = field("entity");
                let line = format!("{} {} {}", field("period"), field("composite"), field("bucket"));
                if entity.is_empty() {
                    line
                } else {
                    format!("{} {}", entity, line)
                }
            })
            .collect();
    }

    let result = value.get("result").unwrap_or(value);
    let priority_keys = ["high_risk_periods", "valid", "entities_analyzed"];

    if let Value::Object(map) = result {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    return vec![format!("{}: {}", key, cell(val))];
                }
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return vec![format!("{}: {}", key, cell(val))];
        }
    }

    vec![cell(result)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scored_rows() {
        let value = json!({"result": {"rows": [
            {"entity": "Acme", "period": "2024", "composite": "100", "bucket": "Critical"},
            {"entity": "", "period": "2024", "composite": "0", "bucket": "Low"}
        ]}});
        assert_eq!(
            minimal_lines(&value),
            vec!["Acme 2024 100 Critical", "2024 0 Low"]
        );
    }

    #[test]
    fn test_summary_headline() {
        let value = json!({"result": {"entities_analyzed": 3, "high_risk_periods": 2}});
        assert_eq!(minimal_lines(&value), vec!["high_risk_periods: 2"]);
    }
}
