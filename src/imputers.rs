//! Statistical imputation for missing values.
//!
//! The cleaning pipeline uses two strategies: median for numeric columns and
//! mode for the target column. Both operate on a single series and return a
//! new one; callers decide where the result goes.

use crate::utils::{fill_numeric_nulls, fill_string_nulls, numeric_values};
use polars::prelude::*;
use std::collections::HashMap;

/// Median of the non-null values of a numeric series, with linear
/// interpolation between the two middle values for even counts.
pub fn numeric_median(series: &Series) -> PolarsResult<Option<f64>> {
    let mut values: Vec<f64> = numeric_values(series)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Ok(None);
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    };
    Ok(Some(median))
}

/// Fill nulls in a numeric series with its median.
///
/// Returns the filled series and the median used, or the series unchanged
/// when every value is null (nothing to compute a median from).
pub fn median_fill(series: &Series) -> PolarsResult<(Series, Option<f64>)> {
    match numeric_median(series)? {
        Some(median) => Ok((fill_numeric_nulls(series, median)?, Some(median))),
        None => Ok((series.clone(), None)),
    }
}

/// Most frequent value of a string series, ignoring nulls.
///
/// Tie-break: among values sharing the max frequency, the one whose first
/// occurrence comes earliest in the column wins. This keeps the result
/// deterministic regardless of hash ordering.
pub fn string_mode(series: &Series) -> PolarsResult<Option<String>> {
    let ca = series.str()?;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for value in ca.into_iter().flatten() {
        let entry = counts.entry(value).or_insert(0);
        if *entry == 0 {
            first_seen.push(value);
        }
        *entry += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for value in &first_seen {
        let count = counts[value];
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    Ok(best.map(|(value, _)| value.to_string()))
}

/// Fill nulls in a string series with its mode. A series with no observed
/// values is returned unchanged.
pub fn mode_fill(series: &Series) -> PolarsResult<(Series, Option<String>)> {
    match string_mode(series)? {
        Some(mode) => Ok((fill_string_nulls(series, &mode)?, Some(mode))),
        None => Ok((series.clone(), None)),
    }
}

/// Most frequent value of a numeric series, ignoring nulls. Same tie-break
/// as [`string_mode`]: earliest first occurrence wins.
pub fn numeric_mode(series: &Series) -> PolarsResult<Option<f64>> {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    let mut first_seen: Vec<f64> = Vec::new();

    for value in numeric_values(series)?.into_iter().flatten() {
        let entry = counts.entry(value.to_bits()).or_insert(0);
        if *entry == 0 {
            first_seen.push(value);
        }
        *entry += 1;
    }

    let mut best: Option<(f64, usize)> = None;
    for value in &first_seen {
        let count = counts[&value.to_bits()];
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((*value, count));
        }
    }
    Ok(best.map(|(value, _)| value))
}

/// Fill nulls in a numeric series with its mode. A series with no observed
/// values is returned unchanged.
pub fn numeric_mode_fill(series: &Series) -> PolarsResult<(Series, Option<f64>)> {
    match numeric_mode(series)? {
        Some(mode) => Ok((fill_numeric_nulls(series, mode)?, Some(mode))),
        None => Ok((series.clone(), None)),
    }
}
