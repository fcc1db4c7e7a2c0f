//! Output of a report run.
//!
//! The aggregate tables are written as CSV or Parquet files and the
//! [`RunSummary`](crate::types::RunSummary) as `churn_report.json`.
//!
//! # Example
//!
//! ```rust,ignore
//! use churn_report::reporting::ReportGenerator;
//!
//! let generator = ReportGenerator::from_config(&config);
//! let written = generator.write_tables(&report)?;
//! let summary = ReportGenerator::build_summary("churn_modelling", rows, seed, &report, &written)?;
//! generator.write_summary(&summary)?;
//! ```

mod generator;

pub use generator::{
    CREDIT_SCORE_FILE, EXITED_AGE_FILE, ReportGenerator, SALARY_FILE, SUMMARY_FILE,
    agreement_rate,
};
