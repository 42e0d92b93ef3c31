//! Shared helpers used across the pipeline modules.

use polars::prelude::*;

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Try to parse a string as a numeric value.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Render an AnyValue as a plain cell string, without the quoting that its
/// Display impl adds around strings. Returns None for null.
pub fn anyvalue_to_cell(value: &AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some((*s).to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Boolean(b) => Some(b.to_string()),
        other => Some(format!("{other}")),
    }
}

/// Extract a column's values as `Option<f64>`, casting through Float64.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    let ca = float_series.f64()?;
    Ok(ca.into_iter().collect())
}

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let values = numeric_values(series)?;
    let filled: Vec<f64> = values
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let ca = series.str()?;
    let filled: Vec<String> = ca
        .into_iter()
        .map(|v| v.unwrap_or(fill_value).to_string())
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Capitalize the first character of a name if it starts with a lowercase
/// ASCII letter; other names are returned unchanged.
pub fn capitalize_if_lowercase(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {
            let mut out = String::with_capacity(name.len());
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
            out
        }
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float32));
        assert!(!is_numeric_dtype(&DataType::String));
    }

    #[test]
    fn test_is_integer_dtype() {
        assert!(is_integer_dtype(&DataType::Int64));
        assert!(!is_integer_dtype(&DataType::Float64));
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string("  -1.5 "), Some(-1.5));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("DAKAR"), None);
    }

    #[test]
    fn test_anyvalue_to_cell_strings_unquoted() {
        let series = Series::new("s".into(), &["DAKAR"]);
        let value = series.get(0).unwrap();
        assert_eq!(anyvalue_to_cell(&value), Some("DAKAR".to_string()));
    }

    #[test]
    fn test_anyvalue_to_cell_null() {
        let series = Series::new("s".into(), &[None::<&str>]);
        let value = series.get(0).unwrap();
        assert_eq!(anyvalue_to_cell(&value), None);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("v".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 2.0).unwrap();
        let values: Vec<f64> = filled.f64().unwrap().into_iter().flatten().collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("s".into(), &[Some("a"), None]);
        let filled = fill_string_nulls(&series, "Unknown").unwrap();
        let values: Vec<&str> = filled.str().unwrap().into_iter().flatten().collect();
        assert_eq!(values, vec!["a", "Unknown"]);
    }

    #[test]
    fn test_capitalize_if_lowercase() {
        assert_eq!(capitalize_if_lowercase("churn"), "Churn");
        assert_eq!(capitalize_if_lowercase("REGION"), "REGION");
        assert_eq!(capitalize_if_lowercase("Tenure"), "Tenure");
        assert_eq!(capitalize_if_lowercase(""), "");
    }
}
