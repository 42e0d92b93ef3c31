//! Table exporters.
//!
//! Every exporter takes a finished frame and returns the serialized bytes;
//! writing them somewhere (download, disk) is the caller's concern. Formats:
//! Excel via `rust_xlsxwriter`, Stata `.dta` (format 114, see [`stata`]),
//! HTML table markup, and row-oriented JSON through the polars writer.

mod stata;

pub use stata::to_stata_bytes;

use crate::error::{ExplorerError, Result};
use crate::utils::{anyvalue_to_cell, is_numeric_dtype, numeric_values};
use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use tracing::info;

fn export_err(format: &str, reason: impl ToString) -> ExplorerError {
    ExplorerError::ExportFailed {
        format: format.to_string(),
        reason: reason.to_string(),
    }
}

/// Serialize a table as an `.xlsx` workbook with one sheet, a header row,
/// and typed cells (numbers stay numbers).
pub fn to_excel_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col_idx, name) in df.get_column_names_str().iter().enumerate() {
        worksheet
            .write_string(0, col_idx as u16, *name)
            .map_err(|e| export_err("xlsx", e))?;
    }

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let series = column.as_materialized_series();
        if is_numeric_dtype(series.dtype()) {
            for (row_idx, value) in numeric_values(series)?.into_iter().enumerate() {
                if let Some(num) = value {
                    worksheet
                        .write_number((row_idx + 1) as u32, col_idx as u16, num)
                        .map_err(|e| export_err("xlsx", e))?;
                }
            }
        } else {
            for row_idx in 0..series.len() {
                let value = series.get(row_idx)?;
                if let Some(text) = anyvalue_to_cell(&value) {
                    worksheet
                        .write_string((row_idx + 1) as u32, col_idx as u16, &text)
                        .map_err(|e| export_err("xlsx", e))?;
                }
            }
        }
    }

    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| export_err("xlsx", e))?;
    info!(rows = df.height(), bytes = bytes.len(), "excel export done");
    Ok(bytes)
}

/// Serialize a table as a standalone HTML `<table>`, with missing values
/// rendered as empty cells.
pub fn to_html_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut out = String::new();
    out.push_str("<table border=\"1\" class=\"dataframe\">\n");

    out.push_str("  <thead>\n    <tr>\n");
    for name in df.get_column_names_str() {
        out.push_str(&format!("      <th>{}</th>\n", escape_html(name)));
    }
    out.push_str("    </tr>\n  </thead>\n");

    out.push_str("  <tbody>\n");
    for row_idx in 0..df.height() {
        out.push_str("    <tr>\n");
        for column in df.get_columns() {
            let value = column.as_materialized_series().get(row_idx)?;
            let cell = anyvalue_to_cell(&value).unwrap_or_default();
            out.push_str(&format!("      <td>{}</td>\n", escape_html(&cell)));
        }
        out.push_str("    </tr>\n");
    }
    out.push_str("  </tbody>\n</table>\n");

    info!(rows = df.height(), "html export done");
    Ok(out.into_bytes())
}

/// Serialize a table as a JSON array of row objects.
pub fn to_json_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut out = df.clone();
    JsonWriter::new(&mut buffer)
        .with_json_format(JsonFormat::Json)
        .finish(&mut out)
        .map_err(|e| export_err("json", e))?;
    info!(rows = df.height(), bytes = buffer.len(), "json export done");
    Ok(buffer)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
