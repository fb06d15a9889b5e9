use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use liquidity_risk_core::period::RawTable;
use liquidity_risk_core::EngineConfig;

/// Read a financial table; `.csv` by extension, JSON rows otherwise.
pub fn read_table(path: &str) -> Result<RawTable, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    if has_extension(&canonical, &["csv"]) {
        let file = fs::File::open(&canonical)
            .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
        return parse_csv(file)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into());
    }

    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(RawTable::from_json(&value)?)
}

/// Header row plus string cells; surrounding whitespace is trimmed.
pub fn parse_csv<R: Read>(reader: R) -> Result<RawTable, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable::new(headers, rows))
}

/// Read an engine configuration; YAML for `.yaml`/`.yml`, JSON otherwise.
pub fn read_config(path: &str) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let config: EngineConfig = if has_extension(&canonical, &["yaml", "yml"]) {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(config)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Resolve and validate the path, preventing directory traversal.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_match() {
        assert!(has_extension(Path::new("a/b.CSV"), &["csv"]));
        assert!(has_extension(Path::new("cfg.yml"), &["yaml", "yml"]));
        assert!(!has_extension(Path::new("data.json"), &["csv"]));
        assert!(!has_extension(Path::new("noext"), &["csv"]));
    }

    #[test]
    fn test_missing_file() {
        let err = read_table("definitely/not/here.csv").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_ragged_csv_rejected() {
        let result = parse_csv("a,b\n1,2,3\n".as_bytes());
        assert!(result.is_err());
    }
}
