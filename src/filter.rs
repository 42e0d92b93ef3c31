//! Multi-predicate filtering over cleaned tables.
//!
//! A filter is the conjunction of an optional categorical equality clause,
//! an optional row-key equality clause, and any number of inclusive numeric
//! range clauses. Clauses combine with logical AND; application order never
//! changes the resulting row set. Filtering is pure: the input table is not
//! mutated and the result is a new frame.

use crate::error::{ExplorerError, Result};
use crate::types::CleanedTable;
use crate::utils::{is_numeric_dtype, numeric_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An inclusive [min, max] constraint on a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeClause {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

/// The predicate set applied as one conjunction.
///
/// A `None`/empty clause means "no constraint from this clause", matching
/// the original's "All Values" selections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicates {
    /// Equality on a categorical column: (column, value).
    pub categorical: Option<(String, String)>,
    /// Equality on the promoted row key.
    pub key: Option<String>,
    /// Inclusive ranges, at most one per numeric column.
    pub ranges: Vec<RangeClause>,
}

impl FilterPredicates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categorical(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.categorical = Some((column.into(), value.into()));
        self
    }

    pub fn with_key(mut self, value: impl Into<String>) -> Self {
        self.key = Some(value.into());
        self
    }

    pub fn with_range(mut self, column: impl Into<String>, min: f64, max: f64) -> Self {
        self.ranges.push(RangeClause {
            column: column.into(),
            min,
            max,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.categorical.is_none() && self.key.is_none() && self.ranges.is_empty()
    }
}

pub struct FilterEngine;

impl FilterEngine {
    /// Apply a predicate set to a cleaned table, producing a new frame.
    ///
    /// A key clause selecting a value absent from the key set yields an
    /// empty table; that is a valid outcome, not an error. A range clause
    /// spanning a column's full observed range keeps every row.
    pub fn apply(table: &CleanedTable, predicates: &FilterPredicates) -> Result<DataFrame> {
        let df = &table.df;
        let mut mask = BooleanChunked::full("mask".into(), true, df.height());

        if let Some((column, value)) = &predicates.categorical {
            mask = &mask & &Self::string_equals(df, column, value)?;
        }

        if let Some(value) = &predicates.key {
            let key_column = table.key_column.as_deref().ok_or_else(|| {
                ExplorerError::ColumnNotFound("row key (no identifier column)".to_string())
            })?;
            mask = &mask & &Self::string_equals(df, key_column, value)?;
        }

        for clause in &predicates.ranges {
            mask = &mask & &Self::in_range(df, clause)?;
        }

        let filtered = df.filter(&mask)?;
        debug!(
            rows_before = df.height(),
            rows_after = filtered.height(),
            "filter applied"
        );
        Ok(filtered)
    }

    fn string_equals(df: &DataFrame, column: &str, value: &str) -> Result<BooleanChunked> {
        let series = df
            .column(column)
            .map_err(|_| ExplorerError::ColumnNotFound(column.to_string()))?
            .as_materialized_series();
        let as_string = series.cast(&DataType::String)?;
        let ca = as_string.str()?;
        Ok(ca
            .into_iter()
            .map(|v| Some(v == Some(value)))
            .collect::<BooleanChunked>()
            .with_name("mask".into()))
    }

    fn in_range(df: &DataFrame, clause: &RangeClause) -> Result<BooleanChunked> {
        let series = df
            .column(&clause.column)
            .map_err(|_| ExplorerError::ColumnNotFound(clause.column.clone()))?
            .as_materialized_series();
        if !is_numeric_dtype(series.dtype()) {
            return Err(ExplorerError::ColumnNotFound(format!(
                "{} (not a numeric column)",
                clause.column
            )));
        }
        let values = numeric_values(series)?;
        Ok(values
            .into_iter()
            .map(|v| Some(v.is_some_and(|x| x >= clause.min && x <= clause.max)))
            .collect::<BooleanChunked>()
            .with_name("mask".into()))
    }
}
