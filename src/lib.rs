//! Churn Navigator Core
//!
//! A Polars-backed engine for exploring telecom churn datasets: validating
//! uploads against a reference template, persisting them per user, cleaning
//! and imputing missing values, filtering, summarizing and exporting.
//!
//! # Overview
//!
//! The library covers the full explorer cycle:
//!
//! - **Upload ingestion**: CSV and Excel payloads parsed into tables
//! - **Schema validation**: column names and classes checked against the
//!   embedded reference template
//! - **Persistence**: per-user parquet store with race-free table naming
//! - **Cleaning**: row-key promotion, name normalization, sentinel handling,
//!   mode/median imputation and explicit numeric coercion
//! - **Filtering**: conjunctive categorical/key/range predicates
//! - **Summaries**: describe-style numeric and categorical statistics
//! - **Exports**: Excel, Stata `.dta`, HTML and JSON
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use churn_navigator::{Cleaner, FilterEngine, FilterPredicates, Summarizer};
//! use churn_navigator::{template, upload};
//!
//! let raw = upload::read_upload(&bytes, "expresso.csv")?;
//! churn_navigator::SchemaValidator::check(&raw, &template::reference_schema())?;
//!
//! let (cleaned, report) = Cleaner::clean(&raw, template::TARGET_COLUMN)?;
//! for warning in &report.warnings {
//!     eprintln!("warning: {warning}");
//! }
//!
//! let predicates = FilterPredicates::new()
//!     .with_categorical("REGION", "DAKAR")
//!     .with_range("MONTANT", 1000.0, 5000.0);
//! let view = FilterEngine::apply(&cleaned, &predicates)?;
//!
//! let summary = Summarizer::summarize(&view)?;
//! let bytes = churn_navigator::export::to_excel_bytes(&view)?;
//! ```

pub mod cleaner;
pub mod error;
pub mod export;
pub mod filter;
pub mod imputers;
pub mod schema;
pub mod store;
pub mod summary;
pub mod template;
pub mod types;
pub mod upload;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::Cleaner;
pub use error::{ExplorerError, Result, ResultExt};
pub use filter::{FilterEngine, FilterPredicates, RangeClause};
pub use schema::SchemaValidator;
pub use store::TableStore;
pub use summary::{CategoricalColumnSummary, NumericColumnSummary, Summarizer, TableSummary};
pub use template::{IDENTIFIER_COLUMN, TARGET_COLUMN, TemplateSchema, UNKNOWN_SENTINEL};
pub use types::{CleanReport, CleanedTable, ColumnClass, StoredTableRecord};
pub use upload::read_upload;
