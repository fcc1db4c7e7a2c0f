//! Age, salary and head count per (geography, gender, exited).

use crate::error::{Result, ResultExt};
use crate::schema::{
    self, AGE, AVG_AGE, AVG_SALARY, ESTIMATED_SALARY, EXITED, EXITED_OR_NOT_COUNT, GENDER,
    GEOGRAPHY,
};
use crate::utils::round_half_away;
use polars::prelude::*;
use tracing::{debug, info};

/// Group by (geography, gender, exited) and compute `avg_age`,
/// `avg_salary` (one decimal, half away from zero) and
/// `number_of_exited_or_not`, sorted ascending by the count.
///
/// Ties on the count are ordered by the group keys.
pub fn exited_age_correlation(df: &DataFrame) -> Result<DataFrame> {
    schema::require_columns(df, &[GEOGRAPHY, GENDER, EXITED, AGE, ESTIMATED_SALARY])?;

    info!("Aggregating age and salary by geography, gender and exit flag...");

    let mut out = df
        .clone()
        .lazy()
        .group_by_stable([col(GEOGRAPHY), col(GENDER), col(EXITED)])
        .agg([
            col(AGE).cast(DataType::Float64).mean().alias(AVG_AGE),
            col(ESTIMATED_SALARY)
                .cast(DataType::Float64)
                .mean()
                .alias(AVG_SALARY),
            len().cast(DataType::Int64).alias(EXITED_OR_NOT_COUNT),
        ])
        .sort(
            [EXITED_OR_NOT_COUNT, GEOGRAPHY, GENDER, EXITED],
            SortMultipleOptions::default(),
        )
        .collect()
        .context("Aggregating age and exit flag")?;

    let rounded: Float64Chunked = out
        .column(AVG_SALARY)?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| v.map(|x| round_half_away(x, 1)))
        .collect();
    out.replace(AVG_SALARY, rounded.with_name(AVG_SALARY.into()).into_series())?;

    debug!("Age/exit table shape: {:?}", out.shape());
    Ok(out)
}
