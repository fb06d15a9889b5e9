pub mod file;
pub mod stdin;

use liquidity_risk_core::period::RawTable;

/// Read the financial table from `path`, or from piped stdin when no path is
/// given.
pub fn read_table(path: Option<&str>) -> Result<RawTable, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_table(path);
    }
    match stdin::read_stdin()? {
        Some(text) => parse_table(&text),
        None => Err("--input <file.csv|file.json> or piped stdin required".into()),
    }
}

/// JSON when the text opens with `[` or `{`, CSV otherwise.
pub fn parse_table(text: &str) -> Result<RawTable, Box<dyn std::error::Error>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed)?;
        Ok(RawTable::from_json(&value)?)
    } else {
        file::parse_csv(trimmed.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_text() {
        let table = parse_table("Company, Year ,Sales\nAcme,2021,\"1,000\"\nAcme,2022,1100\n").unwrap();
        assert_eq!(table.headers, vec!["Company", "Year", "Sales"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], "1,000");
    }

    #[test]
    fn test_json_text() {
        let table = parse_table(r#"  [{"period": "2021", "revenue": 10}]"#).unwrap();
        assert_eq!(table.headers, vec!["period", "revenue"]);
        assert_eq!(table.rows[0], vec!["2021", "10"]);
    }
}
