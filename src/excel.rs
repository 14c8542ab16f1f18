//! Writes the full snapshot to an `.xlsx` workbook, one row per asset.
//!
//! Every provider-supplied field is preserved, not just the ones the
//! analyzer reads. The file is rewritten from scratch each cycle.

use crate::error::PipelineError;
use crate::markets::RawRecord;
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::path::Path;

// Union of field names across all records, in first-appearance order.
fn column_order(snapshot: &[RawRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in snapshot {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

pub fn write_snapshot(snapshot: &[RawRecord], path: &Path) -> Result<(), PipelineError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let columns = column_order(snapshot);
    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name.as_str())?;
    }

    for (i, record) in snapshot.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, name) in columns.iter().enumerate() {
            let col = col as u16;
            match record.get(name) {
                None | Some(Value::Null) => {} // blank cell
                Some(Value::Number(n)) => {
                    if let Some(v) = n.as_f64() {
                        worksheet.write_number(row, col, v)?;
                    }
                }
                Some(Value::String(s)) => {
                    worksheet.write_string(row, col, s.as_str())?;
                }
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                // Nested structures (e.g. the provider's "roi" object) are
                // kept as compact JSON text.
                Some(nested) => {
                    worksheet.write_string(row, col, nested.to_string())?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}
