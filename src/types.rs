//! Core data model types shared across the pipeline.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Coarse semantic class of a column.
///
/// Integer and float dtypes map to `Numerical`; string, categorical and enum
/// dtypes map to `Categorical`. Any other dtype passes through unmapped and
/// is compared literally, so an unexpected dtype can only match itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnClass {
    Categorical,
    Numerical,
    /// Unmapped native dtype, carried as its literal name.
    Other(String),
}

impl ColumnClass {
    /// Classify a polars dtype into a coarse column class.
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64 => ColumnClass::Numerical,
            DataType::String => ColumnClass::Categorical,
            dt if dt.is_categorical() || dt.is_enum() => ColumnClass::Categorical,
            other => ColumnClass::Other(format!("{other:?}")),
        }
    }
}

impl std::fmt::Display for ColumnClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnClass::Categorical => write!(f, "Categorical"),
            ColumnClass::Numerical => write!(f, "Numerical"),
            ColumnClass::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A cleaned table together with its promoted row key, if any.
///
/// The key column (`user_id` in the reference template) stays inside the
/// frame so views and exports keep it, but filtering treats it as the row
/// key and summaries skip it.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub df: DataFrame,
    /// Name of the identifier column promoted to row key, if one was present.
    pub key_column: Option<String>,
}

impl CleanedTable {
    /// Column names excluding the row key.
    pub fn feature_columns(&self) -> Vec<String> {
        self.df
            .get_column_names_str()
            .into_iter()
            .filter(|name| Some(*name) != self.key_column.as_deref())
            .map(|name| name.to_string())
            .collect()
    }
}

/// Audit trail of a single cleaning run.
///
/// `steps` is the ordered list of transformations applied; `warnings` holds
/// recoverable problems (e.g. a numeric column containing text) that the
/// caller should surface to the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanReport {
    pub steps: Vec<String>,
    pub warnings: Vec<String>,
}

impl CleanReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Record of a table persisted in the per-user store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTableRecord {
    pub username: String,
    /// `{username}_table{N}` with N the next unused positive integer.
    pub table_name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_class_from_dtype() {
        assert_eq!(
            ColumnClass::from_dtype(&DataType::Int64),
            ColumnClass::Numerical
        );
        assert_eq!(
            ColumnClass::from_dtype(&DataType::Float64),
            ColumnClass::Numerical
        );
        assert_eq!(
            ColumnClass::from_dtype(&DataType::String),
            ColumnClass::Categorical
        );
    }

    #[test]
    fn test_unmapped_dtype_is_its_own_category() {
        let boolean = ColumnClass::from_dtype(&DataType::Boolean);
        let date = ColumnClass::from_dtype(&DataType::Date);
        assert!(matches!(boolean, ColumnClass::Other(_)));
        // Two different unmapped dtypes never compare equal.
        assert_ne!(boolean, date);
        assert_eq!(boolean, ColumnClass::from_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_feature_columns_exclude_key() {
        let df = polars::df![
            "user_id" => ["a", "b"],
            "REGION" => ["DAKAR", "THIES"],
        ]
        .unwrap();
        let cleaned = CleanedTable {
            df,
            key_column: Some("user_id".to_string()),
        };
        assert_eq!(cleaned.feature_columns(), vec!["REGION".to_string()]);
    }

    #[test]
    fn test_clean_report_roundtrip() {
        let mut report = CleanReport::new();
        report.add_step("Promoted 'user_id' to row key");
        report.add_warning("MONTANT contained non-numeric values");
        assert!(report.has_warnings());

        let json = serde_json::to_string(&report).unwrap();
        let back: CleanReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.steps.len(), 1);
        assert_eq!(back.warnings.len(), 1);
    }
}
