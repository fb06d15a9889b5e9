use serde_json::Value;
use std::io::{self, Write};

use super::{cell, result_rows};

/// Write output as CSV to stdout. Scored tables become one line per period;
/// any other result becomes `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_csv(stdout.lock(), value) {
        eprintln!("CSV write error: {}", e);
    }
}

pub fn write_csv<W: Write>(writer: W, value: &Value) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    if let Some(rows) = result_rows(value) {
        write_rows(&mut wtr, rows)?;
    } else {
        let result = value.get("result").unwrap_or(value);
        wtr.write_record(["field", "value"])?;
        match result {
            Value::Object(map) => {
                for (key, val) in map {
                    wtr.write_record([key.as_str(), &cell(val)])?;
                }
            }
            other => wtr.write_record(["value", &cell(other)])?,
        }
    }

    wtr.flush()?;
    Ok(())
}

fn write_rows<W: Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> Result<(), csv::Error> {
    let Some(Value::Object(first)) = rows.first() else {
        return Ok(());
    };
    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    wtr.write_record(&headers)?;

    for row in rows {
        let line: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(cell).unwrap_or_default())
            .collect();
        wtr.write_record(&line)?;
    }
    Ok(())
}
