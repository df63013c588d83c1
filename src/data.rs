//! Dataset loading and column access using Polars

use crate::error::ReportError;
use log::info;
use polars::prelude::*;
use std::path::Path;

/// Target label column every churn analysis groups against
pub const CHURN: &str = "Churn";

/// Load a CSV file into a DataFrame and log its shape, columns and dtypes
///
/// # Arguments
/// * `file_path` - Path to the CSV file
///
/// # Returns
/// * The loaded `DataFrame`, or `ReportError::Load` when the file is missing or unparseable
pub fn load_dataset(file_path: impl AsRef<Path>) -> crate::Result<DataFrame> {
    let path = file_path.as_ref();
    let load_error = |reason: String| ReportError::Load {
        path: path.display().to_string(),
        reason,
    };

    if !path.is_file() {
        return Err(load_error("file does not exist".to_string()).into());
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| load_error(e.to_string()))?;

    if df.width() == 0 {
        return Err(load_error("no columns found".to_string()).into());
    }

    describe(&df, "Dataset loaded");
    Ok(df)
}

/// Log the shape, column names and per-column dtypes of a frame
pub fn describe(df: &DataFrame, heading: &str) {
    info!("{heading} ====================================");
    info!("Dataset shape: {:?}", df.shape());
    info!("Dataset columns: {:?}", df.get_column_names());
    for series in df.get_columns() {
        info!("  {:<20} {}", series.name(), series.dtype());
    }
}

/// Fail with `ColumnMissing` for the first absent column
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> crate::Result<()> {
    for &name in columns {
        if df.column(name).is_err() {
            return Err(ReportError::ColumnMissing {
                column: name.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Column values rendered as strings; nulls stay `None`
pub fn string_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    require_columns(df, &[name])?;
    let series = df.column(name)?.cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_owned))
        .collect())
}

/// Column values as floats; unparseable entries become `None`
pub fn f64_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    require_columns(df, &[name])?;
    let series = df.column(name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Column values as integers; unparseable entries become `None`
pub fn i64_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<i64>>> {
    require_columns(df, &[name])?;
    let series = df.column(name)?.cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().collect())
}

/// Rows whose integer column equals `value`
pub fn filter_eq(df: &DataFrame, name: &str, value: i64) -> crate::Result<DataFrame> {
    require_columns(df, &[name])?;
    let filtered = df
        .clone()
        .lazy()
        .filter(col(name).cast(DataType::Int64).eq(lit(value)))
        .collect()?;
    Ok(filtered)
}

/// Copy of `df` with an extra column; the input frame is left untouched
pub fn with_derived_column(df: &DataFrame, series: Series) -> crate::Result<DataFrame> {
    let mut derived = df.clone();
    derived.with_column(series)?;
    Ok(derived)
}
