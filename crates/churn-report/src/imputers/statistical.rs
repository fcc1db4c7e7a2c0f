//! Statistical imputation methods.
//!
//! Provides mean, median and mode imputation. Each method replaces the
//! column in place and returns what it filled with.

use crate::error::{ReportError, Result};
use crate::types::{FillValue, ImputationMethod, ImputationRecord};
use crate::utils::{fill_numeric_nulls, fill_string_nulls, string_mode};
use polars::prelude::*;
use tracing::debug;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Apply median imputation for numeric columns.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<ImputationRecord> {
        let series = Self::numeric_column(df, col_name)?;
        let median_val = series
            .median()
            .ok_or_else(|| ReportError::NoValidValues(col_name.to_string()))?;

        Self::fill_with_value(
            df,
            col_name,
            median_val,
            &series,
            processing_steps,
            ImputationMethod::Median,
        )
    }

    /// Apply mean imputation for numeric columns.
    pub fn apply_numeric_mean(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<ImputationRecord> {
        let series = Self::numeric_column(df, col_name)?;
        let mean_val = series
            .mean()
            .ok_or_else(|| ReportError::NoValidValues(col_name.to_string()))?;

        Self::fill_with_value(
            df,
            col_name,
            mean_val,
            &series,
            processing_steps,
            ImputationMethod::Mean,
        )
    }

    /// Apply mode imputation for categorical columns.
    pub fn apply_mode_imputation(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<ImputationRecord> {
        let series = df
            .column(col_name)
            .map_err(|_| ReportError::ColumnNotFound(col_name.to_string()))?
            .as_materialized_series()
            .clone();

        let mode_val = string_mode(&series)
            .ok_or_else(|| ReportError::NoValidValues(col_name.to_string()))?;
        let filled_count = series.null_count();

        let filled = fill_string_nulls(&series, &mode_val)?;
        df.replace(col_name, filled)?;

        processing_steps.push(format!(
            "Filled {} missing '{}' with mode: '{}'",
            filled_count, col_name, mode_val
        ));
        debug!("Mode of '{}' is '{}'", col_name, mode_val);

        Ok(ImputationRecord {
            column: col_name.to_string(),
            method: ImputationMethod::Mode,
            fill_value: FillValue::Text(mode_val),
            filled_count,
        })
    }

    /// Fetch a column as Float64, failing on absence or a non-numeric type.
    fn numeric_column(df: &DataFrame, col_name: &str) -> Result<Series> {
        let series = df
            .column(col_name)
            .map_err(|_| ReportError::ColumnNotFound(col_name.to_string()))?
            .as_materialized_series();

        Ok(series.cast(&DataType::Float64)?)
    }

    /// Fill numeric column with a specific value.
    fn fill_with_value(
        df: &mut DataFrame,
        col_name: &str,
        fill_value: f64,
        series: &Series,
        processing_steps: &mut Vec<String>,
        method: ImputationMethod,
    ) -> Result<ImputationRecord> {
        let filled_count = series.null_count();
        let result = fill_numeric_nulls(series, fill_value)?;
        df.replace(col_name, result)?;

        processing_steps.push(format!(
            "Filled {} missing '{}' with {}: {:.2}",
            filled_count,
            col_name,
            method.as_str(),
            fill_value
        ));
        debug!("{} of '{}' is {}", method.as_str(), col_name, fill_value);

        Ok(ImputationRecord {
            column: col_name.to_string(),
            method,
            fill_value: FillValue::Number(fill_value),
            filled_count,
        })
    }
}
