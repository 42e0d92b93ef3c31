//! Schema validation against the reference template.
//!
//! A candidate table is valid when its column name sequence and its mapped
//! type-class sequence both equal the template's, in content and order. The
//! target column is the one exception: uploads may omit it entirely.

use crate::error::{ExplorerError, Result};
use crate::template::TemplateSchema;
use crate::types::ColumnClass;
use polars::prelude::*;
use tracing::debug;

pub struct SchemaValidator;

impl SchemaValidator {
    /// Check whether a candidate table matches the template exactly: same
    /// column names in the same order, same mapped type class per column.
    ///
    /// Does not mutate the candidate. Unmapped dtypes are compared literally,
    /// so two columns with the same unusual dtype still match while any
    /// mapped/unmapped mixture fails.
    pub fn matches(candidate: &DataFrame, template: &TemplateSchema) -> bool {
        let names = candidate.get_column_names_str();
        if names.len() != template.len() {
            return false;
        }
        for (actual, (expected, _)) in names.iter().zip(template.columns()) {
            if *actual != expected.as_str() {
                return false;
            }
        }

        for (col, (_, expected_class)) in candidate.get_columns().iter().zip(template.columns()) {
            let actual_class = ColumnClass::from_dtype(col.dtype());
            if actual_class != *expected_class {
                debug!(
                    column = %col.name(),
                    expected = %expected_class,
                    actual = %actual_class,
                    "column class mismatch"
                );
                return false;
            }
        }
        true
    }

    /// Validate a candidate against the template, allowing the target column
    /// to be absent. Returns a `Validation` error with guidance pointing at
    /// the column descriptions on mismatch.
    pub fn check(candidate: &DataFrame, template: &TemplateSchema) -> Result<()> {
        if candidate.height() == 0 {
            return Err(ExplorerError::Validation(
                "The uploaded table is empty or improperly formatted. \
                 Please upload a valid file."
                    .to_string(),
            ));
        }

        if Self::matches(candidate, template)
            || Self::matches(candidate, &template.without_target())
        {
            return Ok(());
        }

        Err(ExplorerError::Validation(
            "The structure of the uploaded table does not align with the expected \
             template. Please review the column descriptions to ensure that the \
             column names and data types conform to the required specifications."
                .to_string(),
        ))
    }
}
