//! End-to-end tests over the upload -> validate -> store -> clean -> filter
//! -> summarize -> export cycle, using CSV fixtures shaped like the
//! reference template.

use churn_navigator::{
    CleanedTable, Cleaner, FilterEngine, FilterPredicates, SchemaValidator, Summarizer,
    TableStore, export, template, upload,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read(&path).unwrap_or_else(|e| panic!("missing fixture {path}: {e}"))
}

fn valid_upload() -> DataFrame {
    upload::read_upload(&fixture("valid_upload.csv"), "valid_upload.csv").unwrap()
}

#[test]
fn test_valid_upload_passes_validation() {
    let df = valid_upload();
    assert_eq!(df.height(), 6);
    SchemaValidator::check(&df, &template::reference_schema()).unwrap();
}

#[test]
fn test_text_in_numeric_column_fails_validation() {
    let df = upload::read_upload(&fixture("invalid_upload.csv"), "invalid_upload.csv").unwrap();
    let err = SchemaValidator::check(&df, &template::reference_schema()).unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert!(err.is_recoverable());
}

#[test]
fn test_upload_without_target_column_is_accepted() {
    let df = valid_upload();
    let without_target = df.drop(template::TARGET_COLUMN).unwrap();
    SchemaValidator::check(&without_target, &template::reference_schema()).unwrap();
}

#[test]
fn test_full_pipeline_leaves_no_missing_values() {
    let raw = valid_upload();
    let (cleaned, report) = Cleaner::clean(&raw, template::TARGET_COLUMN).unwrap();

    assert_eq!(cleaned.key_column.as_deref(), Some("user_id"));
    for column in cleaned.df.get_columns() {
        assert_eq!(
            column.null_count(),
            0,
            "column '{}' still has missing values",
            column.name()
        );
    }
    assert!(!report.steps.is_empty());

    // Missing REGION became the sentinel, never a guessed region.
    let regions: Vec<&str> = cleaned
        .df
        .column("REGION")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert!(regions.contains(&"Unknown"));

    // Missing CHURN was imputed with the observed mode ("No").
    let churn: Vec<&str> = cleaned
        .df
        .column("CHURN")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(churn[3], "No");
    assert!(!churn.contains(&"Unknown"));

    // Missing MONTANT became the column median of the observed values.
    let montant: Vec<f64> = cleaned
        .df
        .column("MONTANT")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    // Observed: 4250, 1000, 3050, 600, 7900 -> median 3050.
    assert_eq!(montant[2], 3050.0);
}

#[test]
fn test_filter_and_summarize_cleaned_view() {
    let raw = valid_upload();
    let (cleaned, _) = Cleaner::clean(&raw, template::TARGET_COLUMN).unwrap();

    let predicates = FilterPredicates::new()
        .with_categorical("REGION", "DAKAR")
        .with_range("MONTANT", 3000.0, 8000.0);
    let view = FilterEngine::apply(&cleaned, &predicates).unwrap();
    assert_eq!(view.height(), 3);

    let summary = Summarizer::summarize(&view).unwrap();
    let montant = summary
        .numeric
        .iter()
        .find(|c| c.feature == "MONTANT")
        .unwrap();
    assert_eq!(montant.count, 3);
    assert_eq!(montant.min, 3050.0);
    assert_eq!(montant.max, 7900.0);

    let region = summary
        .categorical
        .iter()
        .find(|c| c.feature == "REGION")
        .unwrap();
    assert_eq!(region.unique, 1);
    assert_eq!(region.top.as_deref(), Some("DAKAR"));
}

#[test]
fn test_summaries_exclude_row_key() {
    let raw = valid_upload();
    let (cleaned, _) = Cleaner::clean(&raw, template::TARGET_COLUMN).unwrap();

    // The same wrapping the CLI does: a filtered view keeps the key column
    // in the frame, but its summary must not treat the key as a feature.
    let predicates = FilterPredicates::new().with_categorical("REGION", "DAKAR");
    let view = CleanedTable {
        df: FilterEngine::apply(&cleaned, &predicates).unwrap(),
        key_column: cleaned.key_column.clone(),
    };
    assert!(view.df.column("user_id").is_ok());

    let summary = Summarizer::summarize_cleaned(&view).unwrap();
    let features: Vec<&str> = summary
        .numeric
        .iter()
        .map(|c| c.feature.as_str())
        .chain(summary.categorical.iter().map(|c| c.feature.as_str()))
        .collect();
    assert!(!features.contains(&"user_id"));
    assert!(features.contains(&"REGION"));
    assert!(features.contains(&"MONTANT"));
}

#[test]
fn test_every_export_format_produces_output() {
    let raw = valid_upload();
    let (cleaned, _) = Cleaner::clean(&raw, template::TARGET_COLUMN).unwrap();

    let xlsx = export::to_excel_bytes(&cleaned.df).unwrap();
    assert_eq!(&xlsx[..2], b"PK");

    let dta = export::to_stata_bytes(&cleaned.df).unwrap();
    assert_eq!(dta[0], 114);

    let html = String::from_utf8(export::to_html_bytes(&cleaned.df).unwrap()).unwrap();
    assert!(html.contains("<th>REGION</th>"));

    let json: serde_json::Value =
        serde_json::from_slice(&export::to_json_bytes(&cleaned.df).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 6);
}

#[test]
fn test_store_names_tables_sequentially() {
    let dir = tempfile::tempdir().unwrap();
    let store = TableStore::new(dir.path());
    let df = valid_upload();

    for expected in 1..=5 {
        let record = store.save("amy", &df).unwrap();
        assert_eq!(record.table_name, format!("amy_table{expected}"));
    }
    let next = store.save("amy", &df).unwrap();
    assert_eq!(next.table_name, "amy_table6");

    let listed = store.list_tables("amy").unwrap();
    assert_eq!(listed.len(), 6);
    assert_eq!(listed[0].table_name, "amy_table1");
}

#[test]
fn test_store_round_trips_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let store = TableStore::new(dir.path());
    let df = valid_upload();

    let record = store.save("bob", &df).unwrap();
    let loaded = store.load("bob", &record.table_name).unwrap();
    assert!(loaded.equals_missing(&df));
}

#[test]
fn test_store_rejects_invalid_upload() {
    let dir = tempfile::tempdir().unwrap();
    let store = TableStore::new(dir.path());
    let df = upload::read_upload(&fixture("invalid_upload.csv"), "invalid_upload.csv").unwrap();

    let err = store.save("amy", &df).unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert!(store.list_tables("amy").unwrap().is_empty());
}

#[test]
fn test_concurrent_saves_never_collide() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(TableStore::new(dir.path()));
    let df = valid_upload();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let df = df.clone();
            std::thread::spawn(move || store.save("amy", &df).unwrap().table_name)
        })
        .collect();
    let mut names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 8);
}

#[test]
fn test_saved_table_survives_a_second_clean() {
    // Clean, persist, reload, clean again: the second pass is a no-op.
    let dir = tempfile::tempdir().unwrap();
    let store = TableStore::new(dir.path());
    let raw = valid_upload();

    let record = store.save("amy", &raw).unwrap();
    let reloaded = store.load("amy", &record.table_name).unwrap();

    let (first, _) = Cleaner::clean(&reloaded, template::TARGET_COLUMN).unwrap();
    let (second, _) = Cleaner::clean(&first.df, template::TARGET_COLUMN).unwrap();
    assert!(first.df.equals(&second.df));
}
