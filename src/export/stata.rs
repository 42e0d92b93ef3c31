//! Stata `.dta` writer, dataset format 114 (Stata 10/11).
//!
//! Layout, in file order: header, typlist, varlist, sortlist, fmtlist,
//! lbllist, variable labels, expansion fields, then the row-major data.
//! Numeric columns are stored as little-endian doubles with Stata's "."
//! missing sentinel; string columns as fixed-width, null-padded byte runs.
//! No value labels are emitted.

use crate::error::{ExplorerError, Result};
use crate::utils::{anyvalue_to_cell, is_numeric_dtype, numeric_values};
use chrono::Utc;
use polars::prelude::*;
use tracing::info;

const FORMAT_114: u8 = 114;
const BYTEORDER_LOHI: u8 = 2;
const FILETYPE_DATA: u8 = 1;
/// Type code for a double in the 114 typlist; 1..=244 mean `str{N}`.
const TYPE_DOUBLE: u8 = 255;
const MAX_STR_WIDTH: usize = 244;
const MAX_VAR_NAME: usize = 32;
/// Smallest double Stata treats as the "." missing value.
const MISSING_DOUBLE: f64 = 8.98846567431158e307;

enum VarType {
    Double,
    Str(usize),
}

struct Variable {
    name: String,
    var_type: VarType,
}

/// Serialize a table as a Stata format-114 `.dta` file.
pub fn to_stata_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let nvar = df.width();
    if nvar == 0 || nvar > i16::MAX as usize {
        return Err(ExplorerError::ExportFailed {
            format: "dta".to_string(),
            reason: format!("variable count {nvar} not representable in format 114"),
        });
    }
    let nobs = df.height();
    if nobs > i32::MAX as usize {
        return Err(ExplorerError::ExportFailed {
            format: "dta".to_string(),
            reason: format!("{nobs} observations exceed the format 114 limit"),
        });
    }

    let variables = plan_variables(df)?;
    let mut out = Vec::new();

    write_header(&mut out, nvar as i16, nobs as i32);
    for var in &variables {
        out.push(match var.var_type {
            VarType::Double => TYPE_DOUBLE,
            VarType::Str(width) => width as u8,
        });
    }
    for var in &variables {
        write_padded(&mut out, var.name.as_bytes(), MAX_VAR_NAME + 1);
    }
    // sortlist: 2*(nvar+1) bytes, all zero (no sort order recorded).
    out.extend(std::iter::repeat_n(0u8, 2 * (nvar + 1)));
    for var in &variables {
        let fmt = match var.var_type {
            VarType::Double => "%9.0g".to_string(),
            VarType::Str(width) => format!("%{width}s"),
        };
        write_padded(&mut out, fmt.as_bytes(), 12);
    }
    // lbllist and variable labels: empty.
    out.extend(std::iter::repeat_n(0u8, nvar * (MAX_VAR_NAME + 1)));
    out.extend(std::iter::repeat_n(0u8, nvar * 81));
    // Expansion fields terminator: one zero byte for the type, four for the length.
    out.extend_from_slice(&[0u8; 5]);

    write_rows(&mut out, df, &variables)?;

    info!(
        rows = nobs,
        variables = nvar,
        bytes = out.len(),
        "stata export done"
    );
    Ok(out)
}

fn write_header(out: &mut Vec<u8>, nvar: i16, nobs: i32) {
    out.push(FORMAT_114);
    out.push(BYTEORDER_LOHI);
    out.push(FILETYPE_DATA);
    out.push(0);
    out.extend_from_slice(&nvar.to_le_bytes());
    out.extend_from_slice(&nobs.to_le_bytes());
    write_padded(out, b"", 81);
    let stamp = Utc::now().format("%d %b %Y %H:%M").to_string();
    write_padded(out, stamp.as_bytes(), 18);
}

fn plan_variables(df: &DataFrame) -> Result<Vec<Variable>> {
    let mut variables = Vec::with_capacity(df.width());
    for (idx, column) in df.get_columns().iter().enumerate() {
        let series = column.as_materialized_series();
        let var_type = if is_numeric_dtype(series.dtype()) {
            VarType::Double
        } else {
            VarType::Str(string_width(series)?)
        };
        variables.push(Variable {
            name: sanitize_name(series.name(), idx),
            var_type,
        });
    }
    Ok(variables)
}

/// Width of a string variable: the longest value in bytes, clamped to the
/// format's 244-byte ceiling, at least 1.
fn string_width(series: &Series) -> Result<usize> {
    let mut width = 1usize;
    for idx in 0..series.len() {
        if let Some(text) = anyvalue_to_cell(&series.get(idx)?) {
            width = width.max(truncate_to_width(&text, MAX_STR_WIDTH).len());
        }
    }
    Ok(width)
}

/// Map a column name onto Stata's variable-name rules: ASCII letters,
/// digits and underscores, not starting with a digit, at most 32 bytes.
fn sanitize_name(name: &str, idx: usize) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_VAR_NAME)
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out = format!("v{idx}{out}");
        out.truncate(MAX_VAR_NAME);
    }
    out
}

fn write_rows(out: &mut Vec<u8>, df: &DataFrame, variables: &[Variable]) -> Result<()> {
    // Columnar cell cache so the row-major walk stays simple.
    enum Cells {
        Doubles(Vec<Option<f64>>),
        Strings(Vec<Option<String>>, usize),
    }
    let mut columns = Vec::with_capacity(variables.len());
    for (column, var) in df.get_columns().iter().zip(variables) {
        let series = column.as_materialized_series();
        match var.var_type {
            VarType::Double => columns.push(Cells::Doubles(numeric_values(series)?)),
            VarType::Str(width) => {
                let mut values = Vec::with_capacity(series.len());
                for idx in 0..series.len() {
                    values.push(anyvalue_to_cell(&series.get(idx)?));
                }
                columns.push(Cells::Strings(values, width));
            }
        }
    }

    for row in 0..df.height() {
        for cells in &columns {
            match cells {
                Cells::Doubles(values) => {
                    let value = values[row].unwrap_or(MISSING_DOUBLE);
                    out.extend_from_slice(&value.to_le_bytes());
                }
                Cells::Strings(values, width) => {
                    let text = values[row].as_deref().unwrap_or("");
                    write_padded(out, truncate_to_width(text, *width).as_bytes(), *width);
                }
            }
        }
    }
    Ok(())
}

/// Longest prefix of `text` that fits `width` bytes without splitting a
/// UTF-8 sequence.
fn truncate_to_width(text: &str, width: usize) -> &str {
    if text.len() <= width {
        return text;
    }
    let mut end = width;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn write_padded(out: &mut Vec<u8>, bytes: &[u8], width: usize) {
    let take = bytes.len().min(width);
    out.extend_from_slice(&bytes[..take]);
    out.extend(std::iter::repeat_n(0u8, width - take));
}
