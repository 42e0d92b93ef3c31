//! Descriptive statistics over tables and filtered views.
//!
//! Mirrors the describe-style output the explorer shows: one row per numeric
//! column (count/mean/std/min/quartiles/max) and one per categorical column
//! (count/unique/top/freq). All statistics are computed over non-missing
//! values; zero-row input produces NaN numeric statistics and empty
//! categorical top/freq rather than an error.

use crate::error::Result;
use crate::imputers::string_mode;
use crate::types::CleanedTable;
use crate::utils::{is_numeric_dtype, numeric_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Summary of one numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericColumnSummary {
    pub feature: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1).
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summary of one categorical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalColumnSummary {
    pub feature: String,
    /// Count of non-missing values.
    pub count: usize,
    pub unique: usize,
    /// Most frequent value; ties resolve to the first encountered.
    pub top: Option<String>,
    /// Frequency of `top`.
    pub freq: Option<usize>,
}

/// Combined summary of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub numeric: Vec<NumericColumnSummary>,
    pub categorical: Vec<CategoricalColumnSummary>,
}

pub struct Summarizer;

impl Summarizer {
    /// Summarize every column of a table.
    pub fn summarize(df: &DataFrame) -> Result<TableSummary> {
        Self::summarize_excluding(df, None)
    }

    /// Summarize a cleaned table, skipping its row-key column.
    pub fn summarize_cleaned(table: &CleanedTable) -> Result<TableSummary> {
        Self::summarize_excluding(&table.df, table.key_column.as_deref())
    }

    fn summarize_excluding(df: &DataFrame, skip: Option<&str>) -> Result<TableSummary> {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for col in df.get_columns() {
            let name = col.name().to_string();
            if Some(name.as_str()) == skip {
                continue;
            }
            let series = col.as_materialized_series();
            if is_numeric_dtype(series.dtype()) {
                numeric.push(Self::numeric_summary(&name, series)?);
            } else if series.dtype() == &DataType::String {
                categorical.push(Self::categorical_summary(&name, series)?);
            }
        }

        Ok(TableSummary {
            numeric,
            categorical,
        })
    }

    fn numeric_summary(name: &str, series: &Series) -> Result<NumericColumnSummary> {
        let mut values: Vec<f64> = numeric_values(series)?.into_iter().flatten().collect();
        values.sort_by(|a, b| a.total_cmp(b));
        let count = values.len();

        if count == 0 {
            return Ok(NumericColumnSummary {
                feature: name.to_string(),
                count: 0,
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                q25: f64::NAN,
                q50: f64::NAN,
                q75: f64::NAN,
                max: f64::NAN,
            });
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let variance = values
                .iter()
                .map(|v| (v - mean).powi(2))
                .sum::<f64>()
                / (count as f64 - 1.0);
            variance.sqrt()
        } else {
            f64::NAN
        };

        Ok(NumericColumnSummary {
            feature: name.to_string(),
            count,
            mean,
            std,
            min: values[0],
            q25: quantile_linear(&values, 0.25),
            q50: quantile_linear(&values, 0.50),
            q75: quantile_linear(&values, 0.75),
            max: values[count - 1],
        })
    }

    fn categorical_summary(name: &str, series: &Series) -> Result<CategoricalColumnSummary> {
        let count = series.len() - series.null_count();
        let unique = if count == 0 {
            0
        } else {
            series.drop_nulls().n_unique()?
        };

        let top = string_mode(series)?;
        let freq = match &top {
            Some(top_value) => {
                let ca = series.str()?;
                Some(
                    ca.into_iter()
                        .flatten()
                        .filter(|v| v == top_value)
                        .count(),
                )
            }
            None => None,
        };

        Ok(CategoricalColumnSummary {
            feature: name.to_string(),
            count,
            unique,
            top,
            freq,
        })
    }
}

/// Quantile with linear interpolation over a sorted, non-empty slice.
fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let position = q * (n - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = position - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_numeric_summary_statistics() {
        let df = df!["v" => [1.0, 2.0, 3.0, 4.0, 5.0]].unwrap();
        let summary = Summarizer::summarize(&df).unwrap();
        let v = &summary.numeric[0];
        assert_eq!(v.count, 5);
        assert_eq!(v.mean, 3.0);
        // Sample std of 1..5 is sqrt(2.5).
        assert!((v.std - 2.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(v.min, 1.0);
        assert_eq!(v.q25, 2.0);
        assert_eq!(v.q50, 3.0);
        assert_eq!(v.q75, 4.0);
        assert_eq!(v.max, 5.0);
    }

    #[test]
    fn test_quartiles_interpolate_linearly() {
        let df = df!["v" => [1.0, 2.0, 3.0, 4.0]].unwrap();
        let summary = Summarizer::summarize(&df).unwrap();
        let v = &summary.numeric[0];
        assert_eq!(v.q25, 1.75);
        assert_eq!(v.q50, 2.5);
        assert_eq!(v.q75, 3.25);
    }

    #[test]
    fn test_numeric_summary_skips_nulls() {
        let df = df!["v" => [Some(10.0), None, Some(30.0)]].unwrap();
        let summary = Summarizer::summarize(&df).unwrap();
        assert_eq!(summary.numeric[0].count, 2);
        assert_eq!(summary.numeric[0].mean, 20.0);
    }

    #[test]
    fn test_categorical_summary() {
        let df = df!["REGION" => [Some("DAKAR"), Some("THIES"), Some("DAKAR"), None]].unwrap();
        let summary = Summarizer::summarize(&df).unwrap();
        let region = &summary.categorical[0];
        assert_eq!(region.count, 3);
        assert_eq!(region.unique, 2);
        assert_eq!(region.top.as_deref(), Some("DAKAR"));
        assert_eq!(region.freq, Some(2));
    }

    #[test]
    fn test_categorical_top_tie_breaks_deterministically() {
        let df = df!["c" => ["B", "A", "A", "B"]].unwrap();
        let summary = Summarizer::summarize(&df).unwrap();
        // Tie between A and B; B encountered first.
        assert_eq!(summary.categorical[0].top.as_deref(), Some("B"));
    }

    #[test]
    fn test_zero_row_input_never_panics() {
        let df = df![
            "v" => Vec::<f64>::new(),
            "c" => Vec::<String>::new(),
        ]
        .unwrap();
        let summary = Summarizer::summarize(&df).unwrap();
        assert!(summary.numeric[0].mean.is_nan());
        assert!(summary.numeric[0].std.is_nan());
        assert_eq!(summary.categorical[0].count, 0);
        assert_eq!(summary.categorical[0].top, None);
        assert_eq!(summary.categorical[0].freq, None);
    }

    #[test]
    fn test_single_value_std_is_undefined() {
        let df = df!["v" => [42.0]].unwrap();
        let summary = Summarizer::summarize(&df).unwrap();
        assert!(summary.numeric[0].std.is_nan());
        assert_eq!(summary.numeric[0].q50, 42.0);
    }

    #[test]
    fn test_summarize_cleaned_skips_key() {
        let df = df![
            "user_id" => ["a", "b"],
            "REGION" => ["DAKAR", "THIES"],
        ]
        .unwrap();
        let table = CleanedTable {
            df,
            key_column: Some("user_id".to_string()),
        };
        let summary = Summarizer::summarize_cleaned(&table).unwrap();
        assert_eq!(summary.categorical.len(), 1);
        assert_eq!(summary.categorical[0].feature, "REGION");
    }
}
