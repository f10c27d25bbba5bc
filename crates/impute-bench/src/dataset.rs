//! Dataset loading.
//!
//! Reads a headered CSV file into a [`DataFrame`], parsing the configured
//! date column into a temporal type. Measurement columns are inferred as
//! numbers from the whole file.

use crate::error::{Result, ResultExt};
use crate::table::{is_datetime_dtype, nan_to_null};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load a dataset from a delimited text file with a header row.
///
/// Float NaN values are read as nulls.
///
/// A `date_column` that is present but could not be parsed as a date is
/// kept as-is and reported with a warning; an absent one is ignored.
pub fn load_dataset(path: impl AsRef<Path>, date_column: Option<&str>) -> Result<DataFrame> {
    let path = path.as_ref();
    info!("Loading dataset from: {}", path.display());

    let df = CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_try_parse_dates(true),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Opening '{}'", path.display()))?
        .finish()
        .context(format!("Parsing '{}'", path.display()))?;
    let df = nan_to_null(df)?;

    if let Some(name) = date_column {
        match df.column(name) {
            Ok(column) if is_datetime_dtype(column.dtype()) => {
                debug!("Date column '{}' parsed as {}", name, column.dtype());
            }
            Ok(column) => warn!(
                "Date column '{}' was read as {} rather than a temporal type",
                name,
                column.dtype()
            ),
            Err(_) => debug!("No date column '{}' in {}", name, path.display()),
        }
    }

    info!("Dataset loaded successfully: {:?}", df.shape());
    Ok(df)
}
