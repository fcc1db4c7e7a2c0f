//! Base table construction.
//!
//! Turns the raw `churn_modelling` rows into the cleaned table every
//! aggregate is derived from:
//! - Dropping the identifier column
//! - Blanking geography, balance and credit score at random positions
//! - Imputing them again (mode, mean, median)

mod null_injection;

pub use null_injection::sample_positions;

use crate::config::{NullInjection, ReportConfig};
use crate::error::{ReportError, Result, ResultExt};
use crate::imputers::StatisticalImputer;
use crate::schema::{self, BALANCE, CREDIT_SCORE, EXITED, GEOGRAPHY, IMPUTED_COLUMNS};
use crate::types::BaseTable;
use crate::utils::null_out_positions;
use polars::prelude::*;
use rand::Rng;
use tracing::{debug, info};

/// Builds the cleaned base table.
#[derive(Debug, Clone)]
pub struct BaseTableBuilder {
    table: String,
    id_column: String,
    injection: NullInjection,
}

impl BaseTableBuilder {
    pub fn new(
        table: impl Into<String>,
        id_column: impl Into<String>,
        injection: NullInjection,
    ) -> Self {
        Self {
            table: table.into(),
            id_column: id_column.into(),
            injection,
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(&config.table, &config.id_column, config.null_injection)
    }

    /// Build the cleaned table from the raw rows.
    ///
    /// The returned table has no missing geography, balance or credit
    /// score; balance and credit score are Float64 and exited is Int32.
    pub fn build<R: Rng + ?Sized>(&self, raw: DataFrame, rng: &mut R) -> Result<BaseTable> {
        if raw.height() == 0 {
            return Err(ReportError::EmptyTable(self.table.clone()));
        }

        schema::require_columns(&raw, &[self.id_column.as_str()])?;
        schema::require_columns(&raw, &IMPUTED_COLUMNS)?;

        info!(
            "Building base table from {} rows x {} columns",
            raw.height(),
            raw.width()
        );

        let mut processing_steps = Vec::new();

        // 1. Drop the identifier
        let mut df = raw.drop(&self.id_column)?;
        processing_steps.push(format!("Dropped identifier column '{}'", self.id_column));

        // 2. Exit flag as 0/1 integers, whatever the source stored it as
        if df.get_column_names().iter().any(|c| c.as_str() == EXITED) {
            let exited = df
                .column(EXITED)?
                .as_materialized_series()
                .cast(&DataType::Int32)
                .context("Casting exit flag to integer")?;
            df.replace(EXITED, exited)?;
        }

        // 3. Synthetic missing values
        let injected_positions = sample_positions(rng, df.height(), &self.injection);
        if !injected_positions.is_empty() {
            for name in IMPUTED_COLUMNS {
                let blanked =
                    null_out_positions(df.column(name)?.as_materialized_series(), &injected_positions)?;
                df.replace(name, blanked)?;
            }
            processing_steps.push(format!(
                "Blanked {} rows of {:?}",
                injected_positions.len(),
                IMPUTED_COLUMNS
            ));
            debug!("Injected nulls at positions {:?}", injected_positions);
        }

        // 4. Impute
        let imputations = vec![
            StatisticalImputer::apply_mode_imputation(&mut df, GEOGRAPHY, &mut processing_steps)
                .context("Imputing geography")?,
            StatisticalImputer::apply_numeric_mean(&mut df, BALANCE, &mut processing_steps)
                .context("Imputing balance")?,
            StatisticalImputer::apply_numeric_median(&mut df, CREDIT_SCORE, &mut processing_steps)
                .context("Imputing credit score")?,
        ];

        let remaining: usize = IMPUTED_COLUMNS
            .iter()
            .map(|name| df.column(name).map(|c| c.null_count()).unwrap_or(0))
            .sum();
        debug!("Missing values remaining in imputed columns: {}", remaining);

        info!(
            "Base table ready: {} rows x {} columns",
            df.height(),
            df.width()
        );

        Ok(BaseTable {
            data: df,
            injected_positions,
            imputations,
            processing_steps,
        })
    }
}
