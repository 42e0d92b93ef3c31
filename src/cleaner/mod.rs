//! Cleaning and imputation pipeline.
//!
//! [`Cleaner::clean`] is a pure transform: it never mutates its input and
//! returns a new table plus an audit report. The steps run in a fixed order
//! and each step's policy is part of the contract:
//!
//! 1. promote the identifier column to row key;
//! 2. capitalize column names that start with a lowercase letter;
//! 3. fill missing values in non-target categorical columns with "Unknown";
//! 4. impute the target column by mode (string targets first revert
//!    "Unknown" to missing; numeric targets keep their dtype);
//! 5. re-infer column classes by attempting numeric coercion;
//! 6. fill missing values in numeric columns with the column median;
//! 7. restore integer dtypes where imputation kept values integral.
//!
//! Cleaning is idempotent: a second pass over an already-clean table changes
//! nothing.

mod coerce;

use crate::error::Result;
use crate::imputers::{median_fill, mode_fill, numeric_mode_fill};
use crate::template::{self, IDENTIFIER_COLUMN, UNKNOWN_SENTINEL};
use crate::types::{CleanReport, CleanedTable};
use crate::utils::{capitalize_if_lowercase, fill_string_nulls, is_integer_dtype, is_numeric_dtype};
use polars::prelude::*;
use tracing::{debug, info};

pub struct Cleaner;

impl Cleaner {
    /// Clean a validated table. `target_column` names the outcome column
    /// (CHURN for the reference template); it may be absent from the table.
    pub fn clean(table: &DataFrame, target_column: &str) -> Result<(CleanedTable, CleanReport)> {
        let mut report = CleanReport::new();
        let mut df = table.clone();

        info!(rows = df.height(), columns = df.width(), "cleaning table");

        // Step 1: identifier promotion. The column stays in the frame but is
        // exempt from renaming and imputation below.
        let key_column = if df.get_column_names_str().contains(&IDENTIFIER_COLUMN) {
            report.add_step(format!("Promoted '{IDENTIFIER_COLUMN}' to row key"));
            Some(IDENTIFIER_COLUMN.to_string())
        } else {
            None
        };

        // Step 2: name normalization.
        let renames: Vec<(String, String)> = df
            .get_column_names_str()
            .into_iter()
            .filter(|name| Some(*name) != key_column.as_deref())
            .filter_map(|name| {
                let normalized = capitalize_if_lowercase(name);
                (normalized != name).then(|| (name.to_string(), normalized))
            })
            .collect();
        for (old, new) in renames {
            df.rename(&old, new.as_str().into())?;
            report.add_step(format!("Renamed column '{old}' to '{new}'"));
        }

        // Step 3: sentinel fill for non-target categoricals.
        let names: Vec<String> = df
            .get_column_names_str()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        for name in &names {
            if name == target_column || Some(name.as_str()) == key_column.as_deref() {
                continue;
            }
            let series = df.column(name)?.as_materialized_series().clone();
            if series.dtype() == &DataType::String && series.null_count() > 0 {
                let missing = series.null_count();
                df.replace(name, fill_string_nulls(&series, UNKNOWN_SENTINEL)?)?;
                report.add_step(format!(
                    "Filled {missing} missing values in '{name}' with '{UNKNOWN_SENTINEL}'"
                ));
            }
        }

        // Step 4: target imputation by mode.
        if names.iter().any(|n| n == target_column) {
            Self::impute_target(&mut df, target_column, &mut report)?;
        } else {
            report.add_step(format!(
                "Target column '{target_column}' absent; skipped target imputation"
            ));
        }

        // Step 5: re-infer column classes via numeric coercion. Columns the
        // template mandates as numeric get a lossy coercion plus a warning
        // instead of silently staying textual.
        let template_numeric = template::reference_schema().numerical_columns();
        for name in &names {
            if Some(name.as_str()) == key_column.as_deref() {
                continue;
            }
            let series = df.column(name)?.as_materialized_series().clone();
            if let Some(cast) = coerce::try_numeric_cast(&series)? {
                debug!(column = %name, dtype = ?cast.dtype(), "re-inferred as numeric");
                df.replace(name, cast)?;
            } else if series.dtype() == &DataType::String
                && template_numeric.contains(&name.as_str())
            {
                let (coerced, lost) = coerce::coerce_lossy(&series)?;
                df.replace(name, coerced)?;
                report.add_warning(format!(
                    "Column '{name}' is expected to be numeric but contained {lost} \
                     non-numeric values; they were treated as missing and results \
                     may be degraded"
                ));
            }
        }

        // Columns that are integer-typed at this point are candidates for
        // dtype restoration after imputation.
        let integer_columns: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|col| is_integer_dtype(col.dtype()))
            .map(|col| col.name().to_string())
            .collect();

        // Step 6: median imputation for numeric columns.
        for name in &names {
            if Some(name.as_str()) == key_column.as_deref() {
                continue;
            }
            let series = df.column(name)?.as_materialized_series().clone();
            if is_numeric_dtype(series.dtype()) && series.null_count() > 0 {
                let missing = series.null_count();
                let (filled, median) = median_fill(&series)?;
                if let Some(median) = median {
                    df.replace(name, filled)?;
                    report.add_step(format!(
                        "Filled {missing} missing values in '{name}' with median {median}"
                    ));
                } else {
                    report.add_warning(format!(
                        "Column '{name}' has no observed values; median imputation skipped"
                    ));
                }
            }
        }

        // Step 7: integer restoration. Median imputation produces floats;
        // cast back where every value is still integral.
        for name in &integer_columns {
            let series = df.column(name)?.as_materialized_series().clone();
            if series.dtype() == &DataType::Float64 && Self::all_integral(&series)? {
                df.replace(name, series.cast(&DataType::Int64)?)?;
                report.add_step(format!("Restored integer dtype for '{name}'"));
            }
        }

        info!(
            steps = report.steps.len(),
            warnings = report.warnings.len(),
            "cleaning complete"
        );
        Ok((CleanedTable { df, key_column }, report))
    }

    /// Mode-impute the target column. String targets first revert the
    /// "Unknown" sentinel to real missingness; numeric targets (a 0/1-coded
    /// outcome) take the most frequent value and keep their dtype. Targets
    /// of any other dtype are left untouched.
    fn impute_target(df: &mut DataFrame, target: &str, report: &mut CleanReport) -> Result<()> {
        let series = df.column(target)?.as_materialized_series().clone();

        if series.dtype() == &DataType::String {
            // Revert the sentinel before computing the mode, so "Unknown"
            // can never be imputed into the target.
            let ca = series.str()?;
            let reverted: Vec<Option<&str>> = ca
                .into_iter()
                .map(|v| v.filter(|s| *s != UNKNOWN_SENTINEL))
                .collect();
            let reverted = Series::new(series.name().clone(), reverted);

            let missing = reverted.null_count();
            let (filled, mode) = mode_fill(&reverted)?;
            df.replace(target, filled)?;
            if missing > 0 {
                match mode {
                    Some(mode) => report.add_step(format!(
                        "Imputed {missing} missing values in target '{target}' with mode '{mode}'"
                    )),
                    None => report.add_warning(format!(
                        "Target '{target}' has no observed values; mode imputation skipped"
                    )),
                }
            }
        } else if is_numeric_dtype(series.dtype()) {
            let missing = series.null_count();
            if missing == 0 {
                return Ok(());
            }
            let original_dtype = series.dtype().clone();
            let (filled, mode) = numeric_mode_fill(&series)?;
            match mode {
                Some(mode) => {
                    // The mode is an observed value, so an integer target
                    // can keep its dtype.
                    let filled = if is_integer_dtype(&original_dtype) {
                        filled.cast(&original_dtype)?
                    } else {
                        filled
                    };
                    df.replace(target, filled)?;
                    report.add_step(format!(
                        "Imputed {missing} missing values in target '{target}' with mode {mode}"
                    ));
                }
                None => report.add_warning(format!(
                    "Target '{target}' has no observed values; mode imputation skipped"
                )),
            }
        }
        Ok(())
    }

    fn all_integral(series: &Series) -> PolarsResult<bool> {
        let ca = series.f64()?;
        Ok(ca.into_iter().flatten().all(|v| v.fract() == 0.0))
    }
}
