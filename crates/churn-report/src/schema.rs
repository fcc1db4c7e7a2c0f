//! Column names of the churn_modelling table and of the derived tables.

use crate::error::{ReportError, Result};
use polars::prelude::*;

pub const GEOGRAPHY: &str = "geography";
pub const GENDER: &str = "gender";
pub const AGE: &str = "age";
pub const BALANCE: &str = "balance";
pub const CREDIT_SCORE: &str = "creditscore";
pub const ESTIMATED_SALARY: &str = "estimatedsalary";
pub const EXITED: &str = "exited";

pub const AVG_CREDIT_SCORE: &str = "avg_credit_score";
pub const TOTAL_EXITED: &str = "total_exited";
pub const AVG_AGE: &str = "avg_age";
pub const AVG_SALARY: &str = "avg_salary";
pub const EXITED_OR_NOT_COUNT: &str = "number_of_exited_or_not";
pub const IS_GREATER: &str = "is_greater";
pub const CORRELATION: &str = "correlation";

/// Columns blanked out and then imputed by the base table builder.
pub const IMPUTED_COLUMNS: [&str; 3] = [GEOGRAPHY, BALANCE, CREDIT_SCORE];

/// Fail with [`ReportError::ColumnNotFound`] for the first missing column.
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    let present = df.get_column_names();
    for name in columns {
        if !present.iter().any(|c| c.as_str() == *name) {
            return Err(ReportError::ColumnNotFound(name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_columns_reports_first_missing() {
        let df = df![
            "geography" => ["France"],
            "gender" => ["Male"],
        ]
        .unwrap();

        assert!(require_columns(&df, &[GEOGRAPHY, GENDER]).is_ok());

        let err = require_columns(&df, &[GEOGRAPHY, EXITED, AGE]).unwrap_err();
        assert!(matches!(err, ReportError::ColumnNotFound(ref c) if c == "exited"));
    }
}
