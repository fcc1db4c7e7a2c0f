//! Agreement between the exit flag and an "above lowest segment salary" label.
//!
//! The threshold is the lowest mean salary of any (geography, gender)
//! segment, rounded half to even to a whole number. A row is labelled
//! `is_greater = 1` only when its salary is strictly above the threshold.

use crate::error::{ReportError, Result, ResultExt};
use crate::schema::{self, CORRELATION, ESTIMATED_SALARY, EXITED, GENDER, GEOGRAPHY, IS_GREATER};
use crate::types::SalaryCorrelation;
use crate::utils::round_half_even;
use polars::prelude::*;
use tracing::{debug, info};

const SEGMENT_SALARY: &str = "segment_salary";

/// Lowest per-(geography, gender) mean salary, rounded to 0 decimals.
pub fn salary_threshold(df: &DataFrame) -> Result<f64> {
    schema::require_columns(df, &[GEOGRAPHY, GENDER, ESTIMATED_SALARY])?;

    let segments = df
        .clone()
        .lazy()
        .filter(col(GEOGRAPHY).is_not_null().and(col(GENDER).is_not_null()))
        .group_by_stable([col(GEOGRAPHY), col(GENDER)])
        .agg([col(ESTIMATED_SALARY)
            .cast(DataType::Float64)
            .mean()
            .alias(SEGMENT_SALARY)])
        .collect()
        .context("Averaging salary per segment")?;

    let lowest = segments
        .column(SEGMENT_SALARY)?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
        .ok_or_else(|| ReportError::NoValidValues(ESTIMATED_SALARY.to_string()))?;

    let threshold = round_half_even(lowest, 0);
    debug!(
        "Lowest segment salary {} over {} segments, threshold {}",
        lowest,
        segments.height(),
        threshold
    );
    Ok(threshold)
}

/// Copy of `df` with an `is_greater` column appended.
///
/// Missing salaries are labelled 0.
pub fn label_above_threshold(df: &DataFrame, threshold: f64) -> Result<DataFrame> {
    schema::require_columns(df, &[ESTIMATED_SALARY])?;

    let salary = df
        .column(ESTIMATED_SALARY)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let flags: Vec<i32> = salary
        .f64()?
        .into_iter()
        .map(|v| v.map_or(0, |x| i32::from(x > threshold)))
        .collect();

    let mut labelled = df.clone();
    labelled.with_column(Series::new(IS_GREATER.into(), flags))?;
    Ok(labelled)
}

/// Label every row against the salary threshold and compare with `exited`.
///
/// The result has one row per input row with columns
/// `exited`, `is_greater`, `correlation`; `correlation` is 1 when the two
/// flags agree. The input table is left untouched.
pub fn exited_salary_correlation(df: &DataFrame) -> Result<SalaryCorrelation> {
    schema::require_columns(df, &[GEOGRAPHY, GENDER, EXITED, ESTIMATED_SALARY])?;

    info!("Correlating exit flag with salary threshold...");

    let threshold = salary_threshold(df)?;
    let labelled = label_above_threshold(df, threshold)?;

    let exited = labelled
        .column(EXITED)?
        .as_materialized_series()
        .cast(&DataType::Int32)?;
    let is_greater = labelled.column(IS_GREATER)?.as_materialized_series().clone();

    let correlation: Vec<i32> = exited
        .i32()?
        .into_iter()
        .zip(is_greater.i32()?.into_iter())
        .map(|(e, g)| match (e, g) {
            (Some(e), Some(g)) if e == g => 1,
            _ => 0,
        })
        .collect();

    let table = DataFrame::new(vec![
        exited.into_column(),
        is_greater.into_column(),
        Series::new(CORRELATION.into(), correlation).into_column(),
    ])?;

    debug!("Salary correlation table shape: {:?}", table.shape());
    Ok(SalaryCorrelation { threshold, table })
}
