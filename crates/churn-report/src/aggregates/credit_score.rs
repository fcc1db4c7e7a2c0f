//! Average credit score and exit count per (geography, gender).

use crate::error::{Result, ResultExt};
use crate::schema::{
    self, AVG_CREDIT_SCORE, CREDIT_SCORE, EXITED, GENDER, GEOGRAPHY, TOTAL_EXITED,
};
use polars::prelude::*;
use tracing::{debug, info};

/// Group by (geography, gender) and compute `avg_credit_score` and
/// `total_exited`, sorted ascending by `avg_credit_score`.
///
/// Rows with a missing geography or gender form no group. Ties on the
/// average are ordered by geography and then gender.
pub fn credit_score_by_segment(df: &DataFrame) -> Result<DataFrame> {
    schema::require_columns(df, &[GEOGRAPHY, GENDER, EXITED, CREDIT_SCORE])?;

    info!("Aggregating credit score by geography and gender...");

    let out = df
        .clone()
        .lazy()
        .filter(col(GEOGRAPHY).is_not_null().and(col(GENDER).is_not_null()))
        .group_by_stable([col(GEOGRAPHY), col(GENDER)])
        .agg([
            col(CREDIT_SCORE)
                .cast(DataType::Float64)
                .mean()
                .alias(AVG_CREDIT_SCORE),
            col(EXITED).cast(DataType::Int64).sum().alias(TOTAL_EXITED),
        ])
        .sort(
            [AVG_CREDIT_SCORE, GEOGRAPHY, GENDER],
            SortMultipleOptions::default(),
        )
        .collect()
        .context("Aggregating credit score")?;

    debug!("Credit score table shape: {:?}", out.shape());
    Ok(out)
}
