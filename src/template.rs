//! Reference template and column description resource.
//!
//! The template dataset defines the expected column names and coarse type
//! classes for every upload. It ships inside the crate and is parsed once
//! per process; both the frame and the derived schema are read-only for the
//! process lifetime.

use crate::error::{ExplorerError, Result};
use crate::types::ColumnClass;
use once_cell::sync::Lazy;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::io::Cursor;

/// Name of the outcome column, imputed by mode and excluded from the upload
/// requirements and the column description resource.
pub const TARGET_COLUMN: &str = "CHURN";

/// Name of the optional identifier column promoted to row key.
pub const IDENTIFIER_COLUMN: &str = "user_id";

/// Sentinel marking missing categorical data, distinct from true missingness.
pub const UNKNOWN_SENTINEL: &str = "Unknown";

const TEMPLATE_CSV: &str = include_str!("../data/template.csv");

static TEMPLATE_DF: Lazy<DataFrame> = Lazy::new(|| {
    CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(TEMPLATE_CSV))
        .finish()
        .expect("embedded template CSV must parse")
});

static TEMPLATE_SCHEMA: Lazy<TemplateSchema> =
    Lazy::new(|| TemplateSchema::from_dataframe(&TEMPLATE_DF));

/// The reference table, loaded once per process.
pub fn reference_table() -> &'static DataFrame {
    &TEMPLATE_DF
}

/// The reference schema derived from [`reference_table`].
pub fn reference_schema() -> &'static TemplateSchema {
    &TEMPLATE_SCHEMA
}

/// An ordered sequence of (column name, type class) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSchema {
    columns: Vec<(String, ColumnClass)>,
}

impl TemplateSchema {
    /// Derive a schema from a table's column names and dtypes.
    pub fn from_dataframe(df: &DataFrame) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|col| {
                (
                    col.name().to_string(),
                    ColumnClass::from_dtype(col.dtype()),
                )
            })
            .collect();
        Self { columns }
    }

    /// Ordered (name, class) pairs.
    pub fn columns(&self) -> &[(String, ColumnClass)] {
        &self.columns
    }

    /// Ordered column names.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The schema with the target column removed. Uploads may omit the
    /// target; every other column is required.
    pub fn without_target(&self) -> TemplateSchema {
        TemplateSchema {
            columns: self
                .columns
                .iter()
                .filter(|(name, _)| name != TARGET_COLUMN)
                .cloned()
                .collect(),
        }
    }

    /// Names of columns the template classifies as Numerical.
    pub fn numerical_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, class)| *class == ColumnClass::Numerical)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Look up the class of a column by name.
    pub fn class_of(&self, name: &str) -> Option<&ColumnClass> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, class)| class)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Static column name → human-readable description mapping, excluding the
/// target column. Exposed read-only to the presentation layer.
pub const COLUMN_DESCRIPTIONS: &[(&str, &str)] = &[
    ("user_id", "Unique identifier for each client"),
    ("REGION", "The location of each client"),
    ("TENURE", "Duration in the network (months)"),
    ("MONTANT", "Top-up amount"),
    ("FREQUENCE_RECH", "Number of times the customer refilled"),
    ("REVENUE", "Monthly income of each client"),
    ("ARPU_SEGMENT", "Income over 90 days / 3"),
    ("FREQUENCE", "Number of times the client has made an income"),
    ("DATA_VOLUME", "Number of connections"),
    ("ON_NET", "Inter expresso call"),
    ("ORANGE", "Call to Orange"),
    ("TIGO", "Call to Tigo"),
    ("ZONE1", "Call to zones1"),
    ("ZONE2", "Call to zones2"),
    ("MRG", "A client who is going"),
    ("REGULARITY", "Number of times the client is active for 90 days"),
    ("TOP_PACK", "The most active packs"),
    (
        "FREQ_TOP_PACK",
        "Number of times the client has activated the top pack packages",
    ),
];

/// Look up the description of a single column.
pub fn describe_column(name: &str) -> Result<&'static str> {
    COLUMN_DESCRIPTIONS
        .iter()
        .find(|(col, _)| *col == name)
        .map(|(_, desc)| *desc)
        .ok_or_else(|| ExplorerError::ColumnNotFound(name.to_string()))
}
