//! CSV source for offline runs.

use crate::error::{ReportError, Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Load an exported copy of the churn table.
///
/// Header names are lower-cased so an export with `CreditScore`-style
/// headers lines up with the Postgres column names.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ReportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input file not found: {}", path.display()),
        )));
    }

    info!("Loading table from CSV: {}", path.display());

    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context("Opening CSV")?
        .finish()
        .context("Reading CSV")?;

    let lowered: Vec<Column> = raw
        .get_columns()
        .iter()
        .map(|c| {
            let name = c.name().to_lowercase();
            c.as_materialized_series()
                .clone()
                .with_name(name.into())
                .into_column()
        })
        .collect();
    let df = DataFrame::new(lowered)?;

    if df.height() == 0 {
        return Err(ReportError::EmptyTable(path.display().to_string()));
    }

    info!("CSV loaded: {:?}", df.shape());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_lowercases_headers() {
        let file = write_temp(
            "RowNumber,Geography,Gender,CreditScore\n1,France,Female,619\n2,Spain,Male,608\n",
        );
        let df = load_csv(file.path()).unwrap();

        let names: Vec<&str> = df.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["rownumber", "geography", "gender", "creditscore"]);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = load_csv("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let file = write_temp("rownumber,geography\n");
        let err = load_csv(file.path()).unwrap_err();
        assert!(err.is_data_quality());
    }
}
