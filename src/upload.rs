//! Upload ingestion.
//!
//! Uploads arrive as raw bytes plus the original filename; the extension
//! decides the parser. CSV goes through the polars reader, Excel through
//! calamine with column dtypes inferred the same way the CSV reader would
//! (a column is numeric when every non-empty cell is).

use crate::error::{ExplorerError, Result};
use calamine::{Data, Reader, Xlsx};
use polars::prelude::*;
use std::io::Cursor;
use tracing::info;

/// Parse an uploaded file into a raw, unvalidated table.
pub fn read_upload(bytes: &[u8], filename: &str) -> Result<DataFrame> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    let df = match extension.as_deref() {
        Some("csv") => read_csv(bytes, filename)?,
        Some("xlsx") => read_xlsx(bytes, filename)?,
        _ => {
            return Err(ExplorerError::Parse {
                filename: filename.to_string(),
                reason: "unsupported file type (expected .csv or .xlsx)".to_string(),
            });
        }
    };

    info!(
        filename,
        rows = df.height(),
        columns = df.width(),
        "upload parsed"
    );
    Ok(df)
}

fn read_csv(bytes: &[u8], filename: &str) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| ExplorerError::Parse {
            filename: filename.to_string(),
            reason: e.to_string(),
        })
}

fn read_xlsx(bytes: &[u8], filename: &str) -> Result<DataFrame> {
    let parse_err = |reason: String| ExplorerError::Parse {
        filename: filename.to_string(),
        reason,
    };

    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.to_vec())).map_err(|e| parse_err(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| parse_err("workbook contains no sheets".to_string()))?
        .map_err(|e| parse_err(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| parse_err("sheet has no header row".to_string()))?;
    let names: Vec<String> = header.iter().map(cell_to_header).collect();
    let body: Vec<&[Data]> = rows.collect();

    let mut columns: Vec<Column> = Vec::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        columns.push(build_column(name, idx, &body).into());
    }
    DataFrame::new(columns).map_err(|e| parse_err(e.to_string()))
}

fn cell_to_header(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Build one series from a sheet column, numeric when every non-empty cell
/// carries a number, string otherwise.
fn build_column(name: &str, idx: usize, rows: &[&[Data]]) -> Series {
    let cells: Vec<Option<&Data>> = rows
        .iter()
        .map(|row| match row.get(idx) {
            None | Some(Data::Empty) => None,
            Some(cell) => Some(cell),
        })
        .collect();

    let all_numeric = cells
        .iter()
        .flatten()
        .all(|cell| matches!(cell, Data::Float(_) | Data::Int(_)));
    let any_value = cells.iter().any(|c| c.is_some());

    if all_numeric && any_value {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Float(f)) => Some(*f),
                Some(Data::Int(i)) => Some(*i as f64),
                _ => None,
            })
            .collect();
        let all_integral = values
            .iter()
            .flatten()
            .all(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64);
        if all_integral {
            let ints: Vec<Option<i64>> = values.into_iter().map(|v| v.map(|f| f as i64)).collect();
            Series::new(name.into(), ints)
        } else {
            Series::new(name.into(), values)
        }
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|cell| {
                cell.map(|c| match c {
                    Data::String(s) => s.clone(),
                    Data::Bool(b) => b.to_string(),
                    other => other.to_string(),
                })
            })
            .collect();
        Series::new(name.into(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_csv_upload_parses() {
        let csv = b"user_id,MONTANT\nu1,100.5\nu2,200.0\n";
        let df = read_upload(csv, "upload.csv").unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names_str(), vec!["user_id", "MONTANT"]);
        assert_eq!(
            df.column("MONTANT").unwrap().dtype(),
            &DataType::Float64
        );
    }

    #[test]
    fn test_csv_extension_is_case_insensitive() {
        let csv = b"a\n1\n";
        assert!(read_upload(csv, "UPLOAD.CSV").is_ok());
    }

    #[test]
    fn test_unsupported_extension_is_a_parse_error() {
        let err = read_upload(b"whatever", "notes.txt").unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_missing_extension_is_a_parse_error() {
        let err = read_upload(b"whatever", "upload").unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_malformed_xlsx_is_a_parse_error() {
        let err = read_upload(b"not a zip archive", "upload.xlsx").unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_xlsx_column_inference() {
        let rows: Vec<Vec<Data>> = vec![
            vec![Data::Float(1.0), Data::String("DAKAR".to_string())],
            vec![Data::Float(2.5), Data::Empty],
        ];
        let refs: Vec<&[Data]> = rows.iter().map(|r| r.as_slice()).collect();
        let numeric = build_column("v", 0, &refs);
        assert_eq!(numeric.dtype(), &DataType::Float64);
        let text = build_column("c", 1, &refs);
        assert_eq!(text.dtype(), &DataType::String);
        assert_eq!(text.null_count(), 1);
    }

    #[test]
    fn test_xlsx_integral_column_becomes_int64() {
        let rows: Vec<Vec<Data>> = vec![vec![Data::Float(1.0)], vec![Data::Int(2)]];
        let refs: Vec<&[Data]> = rows.iter().map(|r| r.as_slice()).collect();
        let col = build_column("v", 0, &refs);
        assert_eq!(col.dtype(), &DataType::Int64);
    }
}
