//! Churn Report Library
//!
//! Builds a cleaned copy of the `churn_modelling` table and derives three
//! summary tables from it, using Polars for all table work.
//!
//! # Overview
//!
//! - **Sources**: fetch the table from Postgres or load an exported CSV
//! - **Base table**: drop the row identifier, blank geography, balance and
//!   credit score at random positions, then impute them with mode, mean and
//!   median
//! - **Credit score**: average credit score and exit count per
//!   (geography, gender)
//! - **Age/exit**: average age, rounded average salary and head count per
//!   (geography, gender, exited)
//! - **Salary correlation**: agreement between the exit flag and "salary
//!   above the lowest segment average"
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use churn_report::{DatabaseSettings, Pipeline, ReportConfig, ReportGenerator};
//!
//! let settings = DatabaseSettings::from_env()?;
//! let raw = churn_report::source::fetch_table(&settings, "churn_modelling").await?;
//!
//! let config = ReportConfig::builder().seed(42).build()?;
//! let report = Pipeline::builder()
//!     .config(config.clone())
//!     .build()?
//!     .process(raw)?;
//!
//! println!("{}", report.credit_score);
//! ReportGenerator::from_config(&config).write_tables(&report)?;
//! ```

pub mod aggregates;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod reporting;
pub mod schema;
pub mod source;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use aggregates::{
    credit_score_by_segment, exited_age_correlation, exited_salary_correlation,
    label_above_threshold, salary_threshold,
};
pub use cleaner::BaseTableBuilder;
pub use config::{
    ConfigValidationError, DatabaseSettings, NullInjection, OutputFormat, ReportConfig,
    ReportConfigBuilder,
};
pub use error::{ReportError, Result as ReportResult, ResultExt};
pub use imputers::StatisticalImputer;
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter, ProgressUpdate,
    ReportStage,
};
pub use reporting::ReportGenerator;
pub use types::{
    BaseTable, ChurnReport, FillValue, ImputationMethod, ImputationRecord, RunSummary,
    SalaryCorrelation,
};
