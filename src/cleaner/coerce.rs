//! Numeric coercion for string columns.

use crate::utils::parse_numeric_string;
use polars::prelude::*;

/// Try to convert a string series to a numeric one.
///
/// Returns `Some` only when every non-null value parses as a number; the
/// result is Int64 when all values are integral, Float64 otherwise. Columns
/// that are already numeric or contain any non-numeric text come back as
/// `None`, leaving the original untouched (the explicit form of the
/// original's errors-are-ignored coercion).
pub(crate) fn try_numeric_cast(series: &Series) -> PolarsResult<Option<Series>> {
    if series.dtype() != &DataType::String {
        return Ok(None);
    }
    let ca = series.str()?;

    let mut parsed: Vec<Option<f64>> = Vec::with_capacity(series.len());
    for value in ca {
        match value {
            None => parsed.push(None),
            Some(raw) => match parse_numeric_string(raw) {
                Some(num) => parsed.push(Some(num)),
                None => return Ok(None),
            },
        }
    }

    if parsed.iter().all(|v| v.is_none()) {
        // An all-null string column carries no numeric evidence.
        return Ok(None);
    }

    Ok(Some(build_numeric_series(series.name().clone(), parsed)))
}

/// Convert a string series to numeric, turning unparseable values into
/// nulls. Returns the coerced series and how many values were lost.
pub(crate) fn coerce_lossy(series: &Series) -> PolarsResult<(Series, usize)> {
    let ca = series.str()?;
    let mut parsed: Vec<Option<f64>> = Vec::with_capacity(series.len());
    let mut lost = 0usize;
    for value in ca {
        match value {
            None => parsed.push(None),
            Some(raw) => match parse_numeric_string(raw) {
                Some(num) => parsed.push(Some(num)),
                None => {
                    lost += 1;
                    parsed.push(None);
                }
            },
        }
    }
    Ok((build_numeric_series(series.name().clone(), parsed), lost))
}

fn build_numeric_series(name: PlSmallStr, values: Vec<Option<f64>>) -> Series {
    let all_integral = values
        .iter()
        .flatten()
        .all(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64);
    if all_integral {
        let ints: Vec<Option<i64>> = values
            .into_iter()
            .map(|v| v.map(|f| f as i64))
            .collect();
        Series::new(name, ints)
    } else {
        Series::new(name, values)
    }
}
