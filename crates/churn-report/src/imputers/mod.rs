//! Imputation module for handling missing values.
//!
//! Statistical imputation (mean, median, mode) used by the base table
//! builder.

mod statistical;

pub use statistical::StatisticalImputer;
